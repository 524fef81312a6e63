use tracing::debug;

use crate::{
    error::Error,
    utils::{create_namespace, Context, CreateOutcome},
};

/// Make sure the namespace exists when `create` is set.
///
/// Without `create` the namespace is assumed to exist and no call is made.
/// A namespace that already exists counts as success.
pub async fn ensure_namespace<P>(
    cx: &Context<P>,
    name: &str,
    create: bool,
) -> Result<Option<CreateOutcome>, Error> {
    if !create {
        debug!(namespace = name, "assuming namespace exists");
        return Ok(None);
    }
    create_namespace(cx, name).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::utils::test::{timeout_after_1s, ApiServerVerifier};

    #[tokio::test]
    async fn creates_namespace() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver
                .handle_create()
                .await
                .expect("namespace should be created")
        });

        let outcome = ensure_namespace(&cx, "monitoring", true)
            .await
            .expect("namespace");
        assert_eq!(outcome, Some(CreateOutcome::Created));

        let request = timeout_after_1s(mocksrv).await;
        assert_eq!(request.method, "POST");
        assert!(request.uri.starts_with("/api/v1/namespaces?"));
        assert_eq!(request.object_kind(), "Namespace");
        assert_eq!(request.object_name(), "monitoring");
        assert_eq!(request.body["metadata"]["labels"]["managed-by"], "ucac");
    }

    #[tokio::test]
    async fn existing_namespace_is_success() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver
                .handle_already_exists()
                .await
                .expect("namespace should be requested")
        });

        let outcome = ensure_namespace(&cx, "monitoring", true)
            .await
            .expect("namespace");
        assert_eq!(outcome, Some(CreateOutcome::AlreadyExists));
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn forbidden_namespace_is_an_error() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver
                .handle_error(403, "Forbidden")
                .await
                .expect("namespace should be requested")
        });

        let err = ensure_namespace(&cx, "monitoring", true).await.unwrap_err();
        assert!(matches!(err, Error::Create { ref kind, .. } if kind == "Namespace"));
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn skips_call_without_create() {
        // Nothing answers the handle, a request would never complete.
        let (cx, _handle) = Context::test(());
        let outcome = ensure_namespace(&cx, "monitoring", false)
            .await
            .expect("namespace");
        assert_eq!(outcome, None);
    }
}
