use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use app_model::{ApproachType, FieldDetail, InMemoryAppModel, PlannedApiClass};
use artifact_gen::{CachedInvoker, GenEngine};
use checkpoint_store::{CheckpointConfig, CheckpointStore};
use llm_requester::{LlmError, RetryPolicy, ScriptedClient};
use refactor_processor::{BatchDriver, ClassRefactor, RefactorRequest};
use response_cache::ResponseCache;
use tempfile::TempDir;

fn policy() -> RetryPolicy {
    RetryPolicy {
        base_delay_secs: 0,
        ..RetryPolicy::default()
    }
}

fn order_model() -> InMemoryAppModel {
    let mut model = InMemoryAppModel::new();
    model.insert_class(
        "com.app.Order",
        "public class Order { /* ... */ }",
        vec![
            FieldDetail {
                variable_name: "order".into(),
                type_name: "Order".into(),
                from_library: false,
            },
            FieldDetail {
                variable_name: "status".into(),
                type_name: "String".into(),
                from_library: false,
            },
        ],
    );
    model.insert_class("com.app.Bad", "public class Bad {}", vec![]);
    model
}

fn api_map() -> BTreeMap<String, PlannedApiClass> {
    let order = PlannedApiClass::new("com.app.Order", "ms-orders", ApproachType::DtoBased, "com.app");
    let bad = PlannedApiClass::new("com.app.Bad", "ms-bad", ApproachType::IdBased, "com.app");
    BTreeMap::from([
        (order.full_name.clone(), order),
        (bad.full_name.clone(), bad),
    ])
}

/// Parsing model stand-in: answers with JSON matching whichever schema the
/// prompt asks for.
fn parser_invoker(cache: Arc<ResponseCache>) -> CachedInvoker {
    let client = ScriptedClient::new("test/parser", |_system: &str, user: &str| {
        if user.contains("proto_code") {
            Ok(r#"{
                "proto_code": "syntax = \"proto3\";",
                "file_name": "order.proto",
                "service_name": "com.app.generated.proto.order.OrderService"
            }"#
            .to_string())
        } else {
            Ok(r#"{
                "class_name": "Generated",
                "package_name": "com.app.generated",
                "source_code": "public class Generated {}",
                "explanation": "",
                "additional_comments": ""
            }"#
            .to_string())
        }
    });
    CachedInvoker::new(cache, Arc::new(client), policy())
}

fn refactorer<F>(dir: &TempDir, gen_responder: F) -> ClassRefactor
where
    F: Fn(&str, &str) -> Result<String, LlmError> + Send + Sync + 'static,
{
    let cache = Arc::new(ResponseCache::new(dir.path()));
    let gen = CachedInvoker::new(
        cache.clone(),
        Arc::new(ScriptedClient::new("test/gen", gen_responder)),
        policy(),
    );
    ClassRefactor::new(
        Arc::new(order_model()),
        Arc::new(api_map()),
        Arc::new(GenEngine::single_model(gen, 3)),
        parser_invoker(cache),
    )
}

fn order_request() -> RefactorRequest {
    RefactorRequest {
        class_name: "com.app.Order".into(),
        method_names: vec![
            "getOrder".into(),
            "setOrder".into(),
            "getStatus".into(),
            "ship".into(),
        ],
        client_microservices: BTreeSet::from(["ms-billing".to_string(), "ms-shipping".to_string()]),
    }
}

#[tokio::test]
async fn dto_class_yields_proto_mapper_server_and_one_client_per_consumer() {
    let dir = TempDir::new().unwrap();
    let prompts = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = prompts.clone();
    let refactor = refactorer(&dir, move |_system, user| {
        sink.lock().unwrap().push(user.to_string());
        Ok("generated artifact".to_string())
    });

    let output = refactor.refactor_class(&order_request()).await.unwrap();

    let proto = output.proto.expect("proto artifact");
    assert_eq!(proto.file_name, "order.proto");
    assert_eq!(proto.content, "syntax = \"proto3\";");
    let mapper = output.mapper.expect("mapper artifact");
    assert!(mapper.content.contains("class OrderMapper"));
    assert!(output.server.is_some());
    assert!(output.server_error.is_none());
    assert_eq!(
        output.clients.keys().cloned().collect::<Vec<_>>(),
        vec!["ms-billing".to_string(), "ms-shipping".to_string()]
    );
    assert!(output.client_errors.is_empty());

    // Accessors shadowing the order/status fields are filtered out, so
    // only `ship` reaches the prompts.
    let prompts = prompts.lock().unwrap();
    let proto_prompt = prompts
        .iter()
        .find(|p| p.contains("Write a proto3 file"))
        .expect("proto prompt");
    assert!(proto_prompt.contains("Methods to expose: ship\n"));
    assert!(!proto_prompt.contains("getOrder"));
    assert!(proto_prompt.contains("order: Order, status: String"));
}

#[tokio::test]
async fn one_failing_client_does_not_abort_the_server_or_its_sibling() {
    let dir = TempDir::new().unwrap();
    let refactor = refactorer(&dir, |_system, user| {
        if user.contains("Implement the gRPC client") && user.contains("ms-shipping") {
            Err(LlmError::Fatal("scripted client outage".into()))
        } else {
            Ok("generated artifact".to_string())
        }
    });

    let output = refactor.refactor_class(&order_request()).await.unwrap();

    assert!(output.server.is_some());
    assert!(output.clients.contains_key("ms-billing"));
    assert!(!output.clients.contains_key("ms-shipping"));
    assert!(output.client_errors.contains_key("ms-shipping"));
    assert!(output.has_failures());
}

#[tokio::test]
async fn proto_failure_aborts_before_any_fan_out_work() {
    let dir = TempDir::new().unwrap();
    let downstream_calls = Arc::new(AtomicUsize::new(0));
    let counter = downstream_calls.clone();
    let refactor = refactorer(&dir, move |_system, user| {
        if user.contains("Write a proto3 file") {
            Err(LlmError::Fatal("scripted proto outage".into()))
        } else {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("generated artifact".to_string())
        }
    });

    let err = refactor.refactor_class(&order_request()).await.unwrap_err();
    assert!(format!("{err:#}").contains("proto generation failed"));
    assert_eq!(downstream_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unplanned_class_is_rejected() {
    let dir = TempDir::new().unwrap();
    let refactor = refactorer(&dir, |_s, _u| Ok("unused".into()));
    let request = RefactorRequest {
        class_name: "com.app.Missing".into(),
        method_names: vec![],
        client_microservices: BTreeSet::new(),
    };
    assert!(refactor.refactor_class(&request).await.is_err());
}

#[tokio::test]
async fn batch_continues_past_a_failing_class() {
    let dir = TempDir::new().unwrap();
    let checkpoint_dir = TempDir::new().unwrap();
    let refactor = refactorer(&dir, |_system, user| {
        if user.contains("com.app.Bad") {
            Err(LlmError::Fatal("scripted outage".into()))
        } else {
            Ok("generated artifact".to_string())
        }
    });
    let store = Arc::new(CheckpointStore::new(
        checkpoint_dir.path(),
        CheckpointConfig {
            should_load: true,
            should_save: true,
        },
    ));
    let driver = BatchDriver::new(Arc::new(refactor), store, 2);

    let bad = RefactorRequest {
        class_name: "com.app.Bad".into(),
        method_names: vec!["work".into()],
        client_microservices: BTreeSet::from(["ms-orders".to_string()]),
    };
    let report = driver
        .run("run-1", vec![order_request(), bad])
        .await
        .unwrap();

    assert_eq!(report.completed, vec!["com.app.Order".to_string()]);
    assert!(report.failed.contains_key("com.app.Bad"));
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn checkpointed_classes_are_skipped_without_any_model_call() {
    let cache_dir = TempDir::new().unwrap();
    let checkpoint_dir = TempDir::new().unwrap();
    let store = Arc::new(CheckpointStore::new(
        checkpoint_dir.path(),
        CheckpointConfig {
            should_load: true,
            should_save: true,
        },
    ));

    let first = refactorer(&cache_dir, |_s, _u| Ok("generated artifact".into()));
    let driver = BatchDriver::new(Arc::new(first), store.clone(), 2);
    let report = driver.run("run-7", vec![order_request()]).await.unwrap();
    assert_eq!(report.completed.len(), 1);

    // Replay: any model call now would surface as a failure.
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let second = refactorer(&cache_dir, move |_s, _u| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::Fatal("must not be called".into()))
    });
    let driver = BatchDriver::new(Arc::new(second), store, 2);
    let report = driver.run("run-7", vec![order_request()]).await.unwrap();

    assert_eq!(report.skipped, vec!["com.app.Order".to_string()]);
    assert!(report.completed.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
