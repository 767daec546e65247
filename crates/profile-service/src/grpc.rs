use crate::pb::profile::v1::profile_server::{Profile as ProfileRpc, ProfileServer};
use crate::pb::profile::v1::{
    DeleteRequest, DeleteResponse, GetByEmailRequest, GetRequest, HealthReply, HealthRequest,
    ProfileItem, RegisterRequest, StatusType, UpdateRequest, FILE_DESCRIPTOR_SET,
};
use crate::{ServiceError, ServiceState};
use profile_core::email::ensure_valid_email;
use profile_core::{Profile, ProfileError, ProfileId};
use std::future::Future;
use std::net::SocketAddr;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic::{Code, Request, Response, Status};
use tracing::{error, info};

/// Metadata key carrying the failed delete outcome on error statuses.
pub const DELETE_STATUS_KEY: &str = "x-profile-delete-status";

#[derive(Clone)]
pub struct ProfileGrpcApi {
    state: ServiceState,
}

impl ProfileGrpcApi {
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl ProfileRpc for ProfileGrpcApi {
    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthReply>, Status> {
        Ok(Response::new(HealthReply {
            status: "ok".to_string(),
            service: "profile-service".to_string(),
            storage: self.state.storage_label().to_string(),
        }))
    }

    async fn create(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<ProfileItem>, Status> {
        let req = request.into_inner();
        ensure_valid_email(&req.email).map_err(profile_error_to_status)?;

        let profile = self
            .state
            .profiles
            .create(&req.email)
            .await
            .map_err(profile_error_to_status)?;
        Ok(Response::new(to_item(profile)))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<ProfileItem>, Status> {
        let id = parse_profile_id(&request.into_inner().id)?;
        let profile = self
            .state
            .profiles
            .get_by_id(id)
            .await
            .map_err(profile_error_to_status)?;
        Ok(Response::new(to_item(profile)))
    }

    async fn get_by_email(
        &self,
        request: Request<GetByEmailRequest>,
    ) -> Result<Response<ProfileItem>, Status> {
        let req = request.into_inner();
        ensure_valid_email(&req.email).map_err(profile_error_to_status)?;

        let profile = self
            .state
            .profiles
            .get_by_email(&req.email)
            .await
            .map_err(profile_error_to_status)?;
        Ok(Response::new(to_item(profile)))
    }

    async fn update(
        &self,
        request: Request<UpdateRequest>,
    ) -> Result<Response<ProfileItem>, Status> {
        let req = request.into_inner();
        ensure_valid_email(&req.new_email).map_err(profile_error_to_status)?;
        let id = parse_profile_id(&req.id)?;

        let profile = self
            .state
            .profiles
            .update_email(id, &req.new_email)
            .await
            .map_err(profile_error_to_status)?;
        Ok(Response::new(to_item(profile)))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let outcome = match parse_profile_id(&request.into_inner().id) {
            Ok(id) => self
                .state
                .profiles
                .delete_by_id(id)
                .await
                .map_err(profile_error_to_status),
            Err(status) => Err(status),
        };

        match outcome {
            Ok(()) => Ok(Response::new(DeleteResponse {
                status: StatusType::Success as i32,
            })),
            Err(status) => {
                let mut metadata = MetadataMap::new();
                metadata.insert(
                    DELETE_STATUS_KEY,
                    MetadataValue::from_static(StatusType::Failed.as_str_name()),
                );
                Err(Status::with_metadata(
                    status.code(),
                    status.message().to_string(),
                    metadata,
                ))
            }
        }
    }
}

/// Delete outcome attached to an error status, if any.
pub fn delete_status(status: &Status) -> Option<StatusType> {
    status
        .metadata()
        .get(DELETE_STATUS_KEY)
        .and_then(|value| value.to_str().ok())
        .and_then(StatusType::from_str_name)
}

fn parse_profile_id(raw: &str) -> Result<ProfileId, Status> {
    raw.parse::<ProfileId>().map_err(profile_error_to_status)
}

fn to_item(profile: Profile) -> ProfileItem {
    ProfileItem {
        id: profile.id.to_string(),
        email: profile.email,
    }
}

fn profile_error_to_status(err: ProfileError) -> Status {
    match err {
        ProfileError::InvalidArgument(message) => Status::invalid_argument(message),
        ProfileError::Conflict(message) => Status::already_exists(message),
        ProfileError::NotFound(message) => Status::not_found(message),
        ProfileError::Persistence(message) => {
            error!(%message, "storage failure");
            Status::new(Code::Internal, message)
        }
    }
}

/// Profile service plus server reflection.
pub fn build_grpc_router(state: ServiceState) -> Result<Router, ServiceError> {
    let service = ProfileServer::new(ProfileGrpcApi::new(state));
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Ok(Server::builder().add_service(reflection).add_service(service))
}

/// Serve until `shutdown` resolves, then drain in-flight calls.
pub async fn serve_grpc<F>(
    state: ServiceState,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send,
{
    build_grpc_router(state)?
        .serve_with_shutdown(addr, shutdown)
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_core::storage::failing::FailingProfileStore;
    use profile_core::storage::recording::RecordingProfileStore;
    use profile_core::InMemoryProfileStore;
    use std::sync::Arc;
    use tonic::codegen::http;
    use tower::ServiceExt;

    fn api() -> ProfileGrpcApi {
        ProfileGrpcApi::new(ServiceState::in_memory())
    }

    async fn create(api: &ProfileGrpcApi, email: &str) -> Result<ProfileItem, Status> {
        api.create(Request::new(RegisterRequest {
            email: email.to_string(),
        }))
        .await
        .map(Response::into_inner)
    }

    #[test]
    fn descriptor_set_is_embedded() {
        assert!(!FILE_DESCRIPTOR_SET.is_empty());
        let name = b"profile/v1/profile.proto";
        assert!(FILE_DESCRIPTOR_SET
            .windows(name.len())
            .any(|window| window == name));
        for method in ["Health", "Create", "Get", "GetByEmail", "Update", "Delete"] {
            let method = method.as_bytes();
            assert!(FILE_DESCRIPTOR_SET
                .windows(method.len())
                .any(|window| window == method));
        }
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_storage() {
        let store = Arc::new(RecordingProfileStore::new(InMemoryProfileStore::new()));
        let api = ProfileGrpcApi::new(ServiceState::new(store.clone()));

        let err = create(&api, "not-an-email").await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let err = api
            .update(Request::new(UpdateRequest {
                id: ProfileId::new().to_string(),
                new_email: "@example.com".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_id_is_invalid_argument() {
        let api = api();
        let err = api
            .get(Request::new(GetRequest {
                id: "not-a-uuid".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let err = api
            .delete(Request::new(DeleteRequest {
                id: "not-a-uuid".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(delete_status(&err), Some(StatusType::Failed));

        let err = api
            .delete(Request::new(DeleteRequest { id: String::new() }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(delete_status(&err), Some(StatusType::Failed));
    }

    #[tokio::test]
    async fn storage_failure_is_internal() {
        let store = Arc::new(FailingProfileStore::new());
        let api = ProfileGrpcApi::new(ServiceState::new(store.clone()));

        let err = create(&api, "a@example.com").await.unwrap_err();
        assert_eq!(err.code(), Code::Internal);

        let err = api
            .get(Request::new(GetRequest {
                id: ProfileId::new().to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal);

        let err = api
            .delete(Request::new(DeleteRequest {
                id: ProfileId::new().to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert_eq!(delete_status(&err), Some(StatusType::Failed));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn duplicate_create_then_delete_then_get() {
        let api = api();
        let created = create(&api, "x@test.com").await.unwrap();
        assert_eq!(created.email, "x@test.com");
        assert!(created.id.parse::<ProfileId>().is_ok());

        let err = create(&api, "x@test.com").await.unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);

        let deleted = api
            .delete(Request::new(DeleteRequest {
                id: created.id.clone(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(deleted.status, StatusType::Success as i32);

        let err = api
            .get(Request::new(GetRequest { id: created.id }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn failed_delete_carries_failed_status() {
        let api = api();
        let created = create(&api, "gone@test.com").await.unwrap();
        api.delete(Request::new(DeleteRequest {
            id: created.id.clone(),
        }))
        .await
        .unwrap();

        let err = api
            .delete(Request::new(DeleteRequest { id: created.id }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(delete_status(&err), Some(StatusType::Failed));
    }

    #[tokio::test]
    async fn update_changes_email_and_frees_old_address() {
        let api = api();
        let created = create(&api, "old@test.com").await.unwrap();

        let updated = api
            .update(Request::new(UpdateRequest {
                id: created.id.clone(),
                new_email: "new@test.com".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "new@test.com");

        let fetched = api
            .get_by_email(Request::new(GetByEmailRequest {
                email: "new@test.com".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fetched.id, created.id);

        assert!(create(&api, "old@test.com").await.is_ok());
    }

    #[tokio::test]
    async fn health_reports_storage_backend() {
        let reply = api()
            .health(Request::new(HealthRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(reply.status, "ok");
        assert_eq!(reply.storage, "memory");
    }

    #[tokio::test]
    async fn unknown_method_is_unimplemented() {
        let server = ProfileServer::new(api());
        let request = http::Request::builder()
            .uri("/profile.v1.Profile/Missing")
            .body(tonic::body::empty_body())
            .unwrap();

        let response = server.oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get("grpc-status")
                .and_then(|v| v.to_str().ok()),
            Some("12")
        );
    }
}
