// File: protondrive-core/tests/mock_invoker_tests.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::{mock, Sequence};

use protondrive_common::models::{ConnectionStatus, LifecycleState};
use protondrive_common::traits::ToolInvoker;
use protondrive_core::{ConnectionController, ControllerConfig, ControllerError, EventBus};
use protondrive_rclone::{ToolError, ToolOutput, ToolStream};

mock! {
    Invoker {}
    #[async_trait]
    impl ToolInvoker for Invoker {
        async fn version(&self) -> Result<ToolOutput, ToolError>;
        async fn delete_profile(&self, name: &str) -> Result<ToolOutput, ToolError>;
        async fn obscure_secret(&self, raw: &str) -> Result<ToolOutput, ToolError>;
        async fn create_profile(
            &self,
            name: &str,
            backend_type: &str,
            fields: &BTreeMap<String, String>,
        ) -> Result<ToolOutput, ToolError>;
        async fn show_profile(&self, name: &str) -> Result<ToolOutput, ToolError>;
        async fn list_remotes(&self) -> Result<ToolOutput, ToolError>;
        async fn list_directory(&self, remote_path: &str) -> Result<ToolOutput, ToolError>;
        async fn sync(
            &self,
            local_dir: &Path,
            remote_dir: &str,
            options: &[String],
        ) -> Result<ToolStream, ToolError>;
        async fn mount(
            &self,
            remote_root: &str,
            mount_point: &Path,
            options: &[String],
        ) -> Result<ToolStream, ToolError>;
    }
}

fn controller(mock: MockInvoker, config: ControllerConfig) -> ConnectionController {
    ConnectionController::new(config, Arc::new(mock), EventBus::new())
}

#[tokio::test]
async fn configure_runs_obscure_delete_create_probe_in_order() {
    let mut mock = MockInvoker::new();
    let mut seq = Sequence::new();

    mock.expect_obscure_secret()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ToolOutput::ok("XkV0bW9zdA\n")));
    mock.expect_delete_profile()
        .withf(|name| name == "protondrive")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ToolOutput::failed(1, "Couldn't find remote")));
    mock.expect_create_profile()
        .withf(|name, backend, fields| {
            name == "protondrive"
                && backend == "protondrive"
                && fields.get("pass").map(String::as_str) == Some("XkV0bW9zdA")
                && fields.get("2fa").map(String::as_str) == Some("123456")
                && fields.values().all(|v| v != "hunter22")
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(ToolOutput::ok("")));
    mock.expect_list_directory()
        .withf(|path| path == "protondrive:")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ToolOutput::ok("Documents\n")));

    let controller = controller(mock, ControllerConfig::default());
    let profile = controller
        .configure("a@proton.me", "hunter22".to_string(), Some(" 123456 "))
        .await
        .unwrap();

    assert_eq!(profile.credentials.obscured_secret, "XkV0bW9zdA");
    assert_eq!(profile.credentials.second_factor.as_deref(), Some("123456"));
    assert_eq!(controller.state().await, LifecycleState::Connected);
}

#[tokio::test]
async fn two_factor_field_name_is_configurable() {
    let mut mock = MockInvoker::new();
    mock.expect_obscure_secret()
        .returning(|_| Ok(ToolOutput::ok("obscured")));
    mock.expect_delete_profile()
        .returning(|_| Ok(ToolOutput::ok("")));
    mock.expect_create_profile()
        .withf(|name, backend, fields| {
            name == "work"
                && backend == "protondrive"
                && fields.get("otp").map(String::as_str) == Some("111111")
                && !fields.contains_key("2fa")
        })
        .times(1)
        .returning(|_, _, _| Ok(ToolOutput::ok("")));
    mock.expect_list_directory()
        .withf(|path| path == "work:")
        .returning(|_| Ok(ToolOutput::ok("")));

    let config = ControllerConfig {
        remote_name: "work".into(),
        two_factor_field: "otp".into(),
        ..ControllerConfig::default()
    };
    let controller = controller(mock, config);
    controller
        .configure("a@proton.me", "pw".to_string(), Some("111111"))
        .await
        .unwrap();
    assert_eq!(controller.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn missing_tool_during_create_is_tool_not_found() {
    let mut mock = MockInvoker::new();
    mock.expect_obscure_secret()
        .returning(|_| Ok(ToolOutput::ok("obscured")));
    mock.expect_delete_profile()
        .returning(|_| Err(ToolError::NotFound("rclone".into())));
    mock.expect_create_profile()
        .returning(|_, _, _| Err(ToolError::NotFound("rclone".into())));
    mock.expect_list_directory().never();

    let controller = controller(mock, ControllerConfig::default());
    let err = controller
        .configure("a@proton.me", "pw-123".to_string(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::ToolNotFound(ref b) if b == "rclone"));
    assert!(matches!(controller.state().await, LifecycleState::ConfigFailed(_)));
}

#[tokio::test]
async fn obscure_returning_the_raw_secret_is_refused() {
    let mut mock = MockInvoker::new();
    mock.expect_obscure_secret()
        .returning(|raw| Ok(ToolOutput::ok(format!("{}\n", raw))));
    mock.expect_delete_profile().never();
    mock.expect_create_profile().never();

    let controller = controller(mock, ControllerConfig::default());
    let err = controller
        .configure("a@proton.me", "plain".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::ObscureFailed(_)));
    assert!(!err.to_string().contains("plain\n"));
}
