use super::*;

use std::time::Duration;

use ingest_core::{FixedDuration, IngestConfig, SimulatedWorker};

fn panel() -> PanelController {
    let engine = IngestEngine::new_with_dependencies(
        IngestConfig::default(),
        Arc::new(SimulatedWorker),
        Arc::new(FixedDuration(Duration::from_millis(500))),
    )
    .expect("engine");
    PanelController::new(Arc::new(engine))
}

fn docs(count: usize) -> Vec<FileMetadata> {
    (0..count)
        .map(|i| FileMetadata::new(format!("doc-{i:02}.txt"), 100 * (i as u64 + 1), "text/plain"))
        .collect()
}

async fn settle(panel: &PanelController) {
    panel.engine().wait_for_idle().await;
}

#[tokio::test(start_paused = true)]
async fn empty_panel_can_close_without_completing_the_stage() {
    let mut panel = panel();
    let view = panel.view().await;
    assert_eq!(view.total_pages, 0);
    assert_eq!(view.page, 1);
    assert_eq!(view.placeholder_rows, 5);
    assert_eq!(view.footer, "0 file(s) uploaded");
    assert!(view.can_close);

    let exit = panel.close().await.expect("close");
    assert!(!exit.knowledgebase_complete);
}

#[tokio::test(start_paused = true)]
async fn close_is_blocked_until_a_file_is_ready() {
    let mut panel = panel();
    let ids = panel.add_files(docs(1)).await.expect("add");
    assert_eq!(panel.close().await, Err(PanelError::CloseBlocked));

    settle(&panel).await;
    assert!(!panel.view().await.can_close);

    panel.request_conversion(ids[0]).await.expect("convert");
    settle(&panel).await;

    let view = panel.view().await;
    assert!(view.can_close);
    assert!(view.is_complete);
    let exit = panel.close().await.expect("close");
    assert!(exit.knowledgebase_complete);

    let mut wizard = WizardProgress::default();
    assert!(wizard.complete(WizardStage::Configuration));
    if exit.knowledgebase_complete {
        assert!(wizard.complete(WizardStage::Knowledgebase));
    }
    assert!(wizard.is_enabled(WizardStage::Profile));
}

#[tokio::test(start_paused = true)]
async fn uploads_are_refused_while_a_batch_is_in_flight() {
    let mut panel = panel();
    panel.add_files(docs(2)).await.expect("first batch");
    assert!(panel.view().await.is_uploading);

    assert_eq!(
        panel.add_files(docs(1)).await,
        Err(PanelError::UploadInProgress)
    );

    settle(&panel).await;
    assert!(!panel.view().await.is_uploading);
    panel.add_files(docs(1)).await.expect("second batch");
    assert_eq!(panel.engine().file_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn page_is_clamped_when_the_filtered_set_shrinks() {
    let mut panel = panel();
    panel.add_files(docs(12)).await.expect("add");
    settle(&panel).await;

    panel.set_page(7).await;
    assert_eq!(panel.controls().page, 3);
    let view = panel.view().await;
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.placeholder_rows, 3);

    panel.set_search("DOC-0");
    let view = panel.view().await;
    assert_eq!(view.filtered_count, 10);
    assert_eq!(view.total_pages, 2);
    assert_eq!(view.page, 2);
    assert_eq!(view.rows.len(), 5);
    assert_eq!(view.total_count, 12);

    panel.set_search("missing");
    let view = panel.view().await;
    assert_eq!(view.total_pages, 0);
    assert_eq!(view.page, 1);
    assert!(view.rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn paging_intents_stay_in_range() {
    let mut panel = panel();
    panel.add_files(docs(7)).await.expect("add");

    assert!(panel.dispatch(PanelIntent::PreviousPage).await.is_applied());
    assert_eq!(panel.controls().page, 1);
    panel.dispatch(PanelIntent::NextPage).await;
    panel.dispatch(PanelIntent::NextPage).await;
    assert_eq!(panel.controls().page, 2);
    panel.dispatch(PanelIntent::SetPage { page: 0 }).await;
    assert_eq!(panel.controls().page, 1);
}

#[tokio::test(start_paused = true)]
async fn toggling_a_column_flips_then_resets_direction() {
    let mut panel = panel();
    assert_eq!(panel.controls().sort_key, SortKey::CreatedAt);
    assert_eq!(panel.controls().sort_direction, SortDirection::Descending);

    panel.toggle_sort(SortKey::CreatedAt);
    assert_eq!(panel.controls().sort_direction, SortDirection::Ascending);

    panel.toggle_sort(SortKey::Size);
    assert_eq!(panel.controls().sort_key, SortKey::Size);
    assert_eq!(panel.controls().sort_direction, SortDirection::Ascending);

    panel.dispatch(PanelIntent::ToggleSort { key: SortKey::Size }).await;
    assert_eq!(panel.controls().sort_direction, SortDirection::Descending);

    panel.add_files(docs(3)).await.expect("add");
    let view = panel.view().await;
    let names: Vec<_> = view.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["doc-02.txt", "doc-01.txt", "doc-00.txt"]);
}

#[tokio::test(start_paused = true)]
async fn rejected_intents_become_ignored_outcomes() {
    let mut panel = panel();
    let ids = panel.add_files(docs(1)).await.expect("add");
    let id = ids[0];

    let outcome = panel
        .dispatch(PanelIntent::RequestConversion { file_id: id })
        .await;
    assert!(matches!(
        outcome,
        IntentOutcome::Ignored(PanelError::Ingest(IngestError::InvalidTransition { .. }))
    ));

    let missing = FileId::random();
    assert_eq!(
        panel
            .dispatch(PanelIntent::DeleteFile { file_id: missing })
            .await,
        IntentOutcome::Ignored(PanelError::Ingest(IngestError::NotFound(missing)))
    );

    settle(&panel).await;
    assert!(panel
        .dispatch(PanelIntent::DeleteFile { file_id: id })
        .await
        .is_applied());
    assert_eq!(panel.view().await.total_count, 0);
}

#[tokio::test(start_paused = true)]
async fn rows_expose_formatted_cells_and_actions() {
    let mut panel = panel();
    panel
        .add_files(vec![FileMetadata::new(
            "Report.PDF",
            1536,
            "application/pdf",
        )])
        .await
        .expect("add");
    panel.set_search("report");

    let queued = panel.view().await;
    let row = &queued.rows[0];
    assert_eq!(row.size, "1.5 KB");
    assert_eq!(row.media_type, "applicatio…");
    assert_eq!(row.media_type_full, "application/pdf");
    assert_eq!(row.status, "Queued");
    assert!(row.can_delete);
    assert!(!row.can_convert);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let transferring = panel.view().await;
    let row = &transferring.rows[0];
    assert_eq!(row.status, "Transferring");
    assert_eq!(row.tooltip, format!("{}% complete", row.progress));
    assert!(!row.can_delete);

    settle(&panel).await;
    let transferred = panel.view().await;
    assert!(transferred.rows[0].can_convert);
    assert_eq!(transferred.rows[0].tooltip, "Transferred");
}

#[tokio::test(start_paused = true)]
async fn view_serializes_for_json_consumers() {
    let mut panel = panel();
    panel.add_files(docs(1)).await.expect("add");
    let encoded = serde_json::to_value(panel.view().await).expect("encode");
    assert_eq!(encoded["footer"], "1 file(s) uploaded");
    assert_eq!(encoded["controls"]["sort_key"], "created_at");
    assert_eq!(encoded["rows"][0]["status"], "Queued");
}
