mod common;

use common::{analyzer_with, FlakyStore, ScriptedInference};
use food_quality::commands::{CommandFlow, CommandHandler};
use food_quality::database::AnalysisStore;
use food_quality::food::record::NewAnalysisRecord;
use std::sync::Arc;

fn handler_with(store: Arc<FlakyStore>, inference: Arc<ScriptedInference>) -> CommandHandler {
    CommandHandler::new(analyzer_with(inference, store))
}

#[tokio::test]
async fn test_command_words_are_case_insensitive() {
    let store = Arc::new(FlakyStore::new().await);
    let inference = Arc::new(ScriptedInference::answering("Quality: ripe"));
    let mut handler = handler_with(store.clone(), inference.clone());

    let flow = handler.handle_command("Analyze photos/Apple.png").await.unwrap();
    assert_eq!(flow, CommandFlow::Continue);
    assert_eq!(inference.call_count(), 1);
    assert_eq!(store.create_count(), 1);
    assert_eq!(
        store.created.lock()[0].image_ref,
        "mem://photos/Apple.png"
    );

    let lists_before = store.list_count();
    handler.handle_command("HISTORY").await.unwrap();
    assert_eq!(store.list_count(), lists_before + 1);

    let id = store.db.list_recent(1).await.unwrap()[0].id.clone();
    handler.handle_command(&format!("Delete {}", id)).await.unwrap();
    assert!(store.db.list_recent(10).await.unwrap().is_empty());

    assert_eq!(handler.handle_command("EXIT").await.unwrap(), CommandFlow::Exit);
}

#[tokio::test]
async fn test_show_prints_a_saved_analysis() {
    let store = Arc::new(FlakyStore::new().await);
    let id = store
        .db
        .create(NewAnalysisRecord {
            image_ref: "mem://pear.jpg".to_string(),
            result_text: "1. Quality assessment\nFirm and unbruised.".to_string(),
            created_at: 1_700_000_000_000,
        })
        .await
        .unwrap();
    let mut handler = handler_with(store.clone(), Arc::new(ScriptedInference::answering("x")));

    // not yet in the published history, so show reloads it
    assert!(handler.analyzer().history().borrow().is_empty());
    handler.handle_command(&format!("show {}", id)).await.unwrap();
    assert_eq!(handler.analyzer().history().borrow().len(), 1);

    handler.handle_command(&format!("Show {}", id)).await.unwrap();
    handler.handle_command("show").await.unwrap();

    let err = handler.handle_command("show no-such-id").await.unwrap_err();
    assert!(err.contains("no-such-id"));
}

#[tokio::test]
async fn test_unknown_command_is_an_error() {
    let store = Arc::new(FlakyStore::new().await);
    let mut handler = handler_with(store, Arc::new(ScriptedInference::answering("x")));

    let err = handler.handle_command("Frobnicate").await.unwrap_err();
    assert!(err.contains("frobnicate"));
    assert_eq!(handler.handle_command("   ").await.unwrap(), CommandFlow::Continue);
}
