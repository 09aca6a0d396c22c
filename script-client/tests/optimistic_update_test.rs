mod support;

use std::time::Duration;

use script_client::{QuestionPatch, ScriptError};
use serde_json::json;
use shared_types::{Breadth, Depth, ErrorKind, FollowUp, Persona};
use support::{flat_question, id, network_down, nested_question, seeded, success, ScriptedUpdate};
use tokio::sync::oneshot;

fn three_questions() -> Vec<serde_json::Value> {
    vec![
        flat_question(1, "Low", "Why-How", 0),
        nested_question(2, "Medium", "Evidence-first", 1),
        flat_question(3, "Low", "Storytelling", 2),
    ]
}

#[tokio::test]
async fn test_breadth_change_is_visible_immediately_and_rolled_back_on_failure() {
    let (actions, service) = seeded(three_questions()).await;
    let q0 = actions.store().get(&id("2")).expect("question 2");

    let (tx, rx) = oneshot::channel();
    service.push_update("2", ScriptedUpdate::reply(Err(network_down())).gated(rx));

    let id_2_l27 = id("2");
    let update = actions.update_question(&id_2_l27, QuestionPatch::new().breadth(Breadth::High));
    let (result, optimistic) = tokio::join!(update, async {
        let seen = actions.store().get(&id("2")).map(|q| q.controls.breadth);
        tx.send(()).ok();
        seen
    });

    assert_eq!(optimistic, Some(Breadth::High));
    assert!(matches!(result, Err(ScriptError::Network(_))));

    let after = actions.store().get(&id("2")).expect("question 2");
    assert_eq!(after, q0);
    assert_eq!(after.controls.breadth, Breadth::Medium);

    let error = actions.store().error().expect("error recorded");
    assert_eq!(error.kind, ErrorKind::Network);
    assert_eq!(error.message, "Failed to update question.");
    assert_eq!(error.question_id, Some(id("2")));
    assert!(actions.pending_ids().is_empty());
}

#[tokio::test]
async fn test_confirmation_replaces_entry_with_server_copy() {
    let (actions, service) = seeded(three_questions()).await;
    service.push_update(
        "1",
        ScriptedUpdate::reply(Ok(success(json!({
            "id": 1,
            "main_question": "Question 1?",
            "controls": {"breadth": "Low", "persona": "Metrics-driven", "depth": 0},
            "follow_ups": [{"question": "Which metric moved?", "nested": ["By how much?"]}]
        })))),
    );

    let confirmed = actions
        .update_question(&id("1"), QuestionPatch::new().persona(Persona::MetricsDriven))
        .await
        .expect("update succeeds");

    assert_eq!(confirmed.controls.persona, Persona::MetricsDriven);
    assert_eq!(
        confirmed.follow_ups,
        vec![FollowUp::new("Which metric moved?").with_nested(["By how much?"])]
    );
    assert_eq!(actions.store().get(&id("1")), Some(confirmed));
    assert_eq!(actions.store().position_of(&id("1")), Some(0));
    assert!(actions.store().error().is_none());
}

#[tokio::test]
async fn test_malformed_confirmation_rolls_back_as_validation_error() {
    let (actions, service) = seeded(three_questions()).await;
    let q0 = actions.store().get(&id("3")).expect("question 3");

    service.push_update("3", ScriptedUpdate::reply(Ok(success(json!(null)))));
    let result = actions
        .update_question(&id("3"), QuestionPatch::new().depth(Depth::new(3).unwrap()))
        .await;
    assert!(matches!(result, Err(ScriptError::Validation(_))));
    assert_eq!(actions.store().get(&id("3")), Some(q0.clone()));
    assert_eq!(
        actions.store().error().map(|e| e.kind),
        Some(ErrorKind::Validation)
    );

    service.push_update(
        "3",
        ScriptedUpdate::reply(Ok(success(json!({"id": 99, "main_question": "Wrong one"})))),
    );
    let result = actions
        .update_question(&id("3"), QuestionPatch::new().breadth(Breadth::High))
        .await;
    assert!(matches!(result, Err(ScriptError::Validation(_))));
    assert_eq!(actions.store().get(&id("3")), Some(q0));
}

#[tokio::test]
async fn test_update_request_carries_current_entry_and_changed_fields_only() {
    let (actions, service) = seeded(three_questions()).await;

    actions
        .update_question(&id("2"), QuestionPatch::new().breadth(Breadth::High))
        .await
        .expect("update succeeds");
    actions
        .regenerate_follow_ups(&id("1"))
        .await
        .expect("regenerate succeeds");

    let requests = service.update_requests();
    assert_eq!(requests.len(), 2);

    let first = &requests[0];
    assert_eq!(first.resume_text, support::RESUME_TEXT);
    assert_eq!(first.question.id, id("2"));
    assert_eq!(first.question.controls.breadth, Breadth::High);
    assert_eq!(first.breadth, Some(Breadth::High));
    assert_eq!(first.depth, None);
    assert_eq!(first.persona, None);
    assert_eq!(first.regenerate_followups, None);

    let wire = serde_json::to_value(first).unwrap();
    assert!(wire.get("depth").is_none());
    assert_eq!(wire["question"]["controls"]["breadth"], "High");

    let second = &requests[1];
    assert_eq!(second.regenerate_followups, Some(true));
    assert_eq!(second.breadth, None);
}

#[tokio::test]
async fn test_unknown_id_and_blank_text_fail_without_touching_collection() {
    let (actions, service) = seeded(three_questions()).await;
    let before = actions.store().questions();

    let result = actions
        .update_question(&id("42"), QuestionPatch::new().breadth(Breadth::Low))
        .await;
    assert!(matches!(result, Err(ScriptError::NotFound(_))));

    let result = actions
        .update_question(&id("1"), QuestionPatch::new().main_question("   "))
        .await;
    assert!(matches!(result, Err(ScriptError::InvalidDraft(_))));

    assert_eq!(actions.store().questions(), before);
    assert!(service.update_requests().is_empty());
    assert!(actions.store().error().is_some());
}

#[tokio::test]
async fn test_failure_on_one_id_does_not_clobber_success_on_another() {
    let (actions, service) = seeded(three_questions()).await;
    let q1 = actions.store().get(&id("1")).expect("question 1");

    let (tx, rx) = oneshot::channel();
    service.push_update("1", ScriptedUpdate::reply(Err(network_down())).gated(rx));

    let id_1_l165 = id("1");
    let failing = actions.update_question(&id_1_l165, QuestionPatch::new().breadth(Breadth::High));
    let id_2_l167 = id("2");
    let succeeding =
        actions.update_question(&id_2_l167, QuestionPatch::new().persona(Persona::Storytelling));

    let (failed, succeeded) = tokio::join!(failing, async {
        let result = succeeding.await;
        tx.send(()).ok();
        result
    });

    assert!(failed.is_err());
    assert_eq!(
        succeeded.expect("id 2 succeeds").controls.persona,
        Persona::Storytelling
    );
    assert_eq!(actions.store().get(&id("1")), Some(q1));
    assert_eq!(
        actions.store().get(&id("2")).map(|q| q.controls.persona),
        Some(Persona::Storytelling)
    );
}

#[tokio::test]
async fn test_rollback_leaves_concurrent_local_edits_to_other_fields() {
    let (actions, service) = seeded(three_questions()).await;

    let (tx, rx) = oneshot::channel();
    service.push_update("1", ScriptedUpdate::reply(Err(network_down())).gated(rx));

    let id_1_l194 = id("1");
    let update = actions.update_question(&id_1_l194, QuestionPatch::new().breadth(Breadth::High));
    let (result, ()) = tokio::join!(update, async {
        actions
            .edit_local(&id("1"), QuestionPatch::new().main_question("Reworded?"))
            .expect("local edit");
        tx.send(()).ok();
    });

    assert!(result.is_err());
    let q1 = actions.store().get(&id("1")).expect("question 1");
    assert_eq!(q1.controls.breadth, Breadth::Low);
    assert_eq!(q1.main_question, "Reworded?");
}

#[tokio::test]
async fn test_stale_response_for_same_id_is_ignored() {
    let (actions, service) = seeded(three_questions()).await;

    let (tx, rx) = oneshot::channel();
    service.push_update(
        "2",
        ScriptedUpdate::reply(Ok(success(json!({
            "id": 2,
            "main_question": "Stale server copy",
            "breadth": "High"
        }))))
        .gated(rx),
    );

    let id_2_l223 = id("2");
    let older = actions.update_question(&id_2_l223, QuestionPatch::new().breadth(Breadth::High));
    let id_2_l225 = id("2");
    let newer = actions.update_question(
        &id_2_l225,
        QuestionPatch::new().depth(Depth::new(3).unwrap()),
    );

    let (older, newer) = tokio::join!(older, async {
        let result = newer.await;
        tx.send(()).ok();
        result
    });

    assert!(matches!(older, Err(ScriptError::Superseded(_))));
    let newer = newer.expect("latest confirmation applies");

    let q2 = actions.store().get(&id("2")).expect("question 2");
    assert_eq!(q2, newer);
    assert_ne!(q2.main_question, "Stale server copy");
    assert_eq!(q2.controls.breadth, Breadth::High);
    assert_eq!(q2.controls.depth.value(), 3);
    assert!(actions.store().error().is_none());
}

#[tokio::test]
async fn test_latest_failure_reverts_every_pending_edit_on_the_id() {
    let (actions, service) = seeded(three_questions()).await;
    let q0 = actions.store().get(&id("2")).expect("question 2");

    let (older_tx, older_rx) = oneshot::channel();
    let (newer_tx, newer_rx) = oneshot::channel();
    service.push_update("2", ScriptedUpdate::echo().gated(older_rx));
    service.push_update(
        "2",
        ScriptedUpdate::reply(Err(network_down())).gated(newer_rx),
    );

    let id_2_l259 = id("2");
    let older = actions.update_question(&id_2_l259, QuestionPatch::new().breadth(Breadth::High));
    let id_2_l261 = id("2");
    let newer =
        actions.update_question(&id_2_l261, QuestionPatch::new().persona(Persona::MetricsDriven));

    let (older, newer, ()) = tokio::join!(older, newer, async {
        newer_tx.send(()).ok();
        tokio::task::yield_now().await;
        older_tx.send(()).ok();
    });

    assert!(matches!(newer, Err(ScriptError::Network(_))));
    assert!(matches!(older, Err(ScriptError::Superseded(_))));
    assert_eq!(actions.store().get(&id("2")), Some(q0));
}

#[tokio::test]
async fn test_response_after_delete_does_not_resurrect_question() {
    let (actions, service) = seeded(three_questions()).await;

    let (tx, rx) = oneshot::channel();
    service.push_update("3", ScriptedUpdate::echo().gated(rx));

    let id_3_l281 = id("3");
    let update = actions.update_question(&id_3_l281, QuestionPatch::new().breadth(Breadth::High));
    let (result, deleted) = tokio::join!(update, async {
        let deleted = actions.delete_question(&id("3"));
        tx.send(()).ok();
        deleted
    });

    assert!(deleted.is_ok());
    assert!(matches!(result, Err(ScriptError::Superseded(_))));
    assert!(actions.store().get(&id("3")).is_none());
    assert_eq!(actions.store().len(), 2);
    assert!(actions.pending_ids().is_empty());
}

#[tokio::test]
async fn test_failed_response_after_delete_does_not_resurrect_question() {
    let (actions, service) = seeded(three_questions()).await;

    let (tx, rx) = oneshot::channel();
    service.push_update("1", ScriptedUpdate::reply(Err(network_down())).gated(rx));

    let id_1_l302 = id("1");
    let update = actions.update_question(&id_1_l302, QuestionPatch::new().breadth(Breadth::High));
    let (result, _) = tokio::join!(update, async {
        let deleted = actions.delete_question(&id("1"));
        tx.send(()).ok();
        deleted
    });

    assert!(matches!(result, Err(ScriptError::Superseded(_))));
    assert!(actions.store().get(&id("1")).is_none());
    assert!(actions.store().error().is_none());
}

#[tokio::test]
async fn test_abandoned_confirmation_rolls_back() {
    let (actions, service) = seeded(three_questions()).await;
    let q0 = actions.store().get(&id("2")).expect("question 2");

    let (_tx, rx) = oneshot::channel::<()>();
    service.push_update("2", ScriptedUpdate::echo().gated(rx));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        actions.update_question(&id("2"), QuestionPatch::new().breadth(Breadth::High)),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(actions.store().get(&id("2")), Some(q0));
    assert!(actions.pending_ids().is_empty());

    actions
        .update_question(&id("2"), QuestionPatch::new().breadth(Breadth::Low))
        .await
        .expect("later update succeeds");
    assert_eq!(
        actions.store().get(&id("2")).map(|q| q.controls.breadth),
        Some(Breadth::Low)
    );
}

#[tokio::test]
async fn test_confirmation_keeps_text_edited_while_in_flight() {
    let (actions, service) = seeded(three_questions()).await;

    let (tx, rx) = oneshot::channel();
    service.push_update("1", ScriptedUpdate::echo().gated(rx));

    let id_1_l349 = id("1");
    let update = actions.update_question(&id_1_l349, QuestionPatch::new().breadth(Breadth::High));
    let (result, edited) = tokio::join!(update, async {
        let edited = actions.edit_local(&id("1"), QuestionPatch::new().main_question("Reworded?"));
        tx.send(()).ok();
        edited
    });

    assert!(edited.is_ok());
    let confirmed = result.expect("update succeeds");
    assert_eq!(confirmed.main_question, "Reworded?");
    assert_eq!(confirmed.controls.breadth, Breadth::High);
    assert_eq!(actions.store().get(&id("1")), Some(confirmed));
    assert!(actions.pending_ids().is_empty());
}
