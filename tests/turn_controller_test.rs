//! Registration and move submission against a scripted gateway.

mod common;

use ao_tictactoe::{
    ActionResult, GameStore, GatewayError, MatchPhase, Notice, Position, ProcessId, SharedStore,
    Signer, StatePayload, Symbol, Transition, TurnController, TurnError,
};
use common::{
    EMPTY_BOARD, GAME, ME, OPPONENT, ScriptedGateway, TestSigner, message, playing_state, reply,
};
use std::sync::Arc;

fn signer() -> Option<Arc<dyn Signer>> {
    Some(Arc::new(TestSigner::new(ME)))
}

fn store_with(state: Option<String>) -> SharedStore {
    let store = SharedStore::new(GameStore::new(ProcessId::from(GAME), Some(ME.to_string())));
    if let Some(state) = state {
        store.apply(Transition::Snapshot(StatePayload::from_json(&state).unwrap()));
    }
    store
}

fn controller(gateway: &Arc<ScriptedGateway>, store: &SharedStore) -> TurnController {
    TurnController::new(gateway.clone(), store.clone(), signer())
}

#[tokio::test]
async fn test_register_records_symbol() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(reply(vec![message(
        &[("Action", "Registered"), ("Symbol", "X")],
        "",
    )])));
    let store = store_with(None);

    let notice = controller(&gateway, &store).register().await.unwrap();

    assert_eq!(notice, Some(Notice::Registered));
    assert_eq!(store.snapshot().players().symbol_of(ME), Some(Symbol::X));
    assert_eq!(gateway.submitted_actions(), vec!["Register"]);
    assert_eq!(gateway.submitted.lock().unwrap()[0].process, ProcessId::from(GAME));
}

#[tokio::test]
async fn test_register_bot_starts_match() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(reply(vec![message(
        &[("Action", "Registered"), ("Symbol", "X")],
        "",
    )])));
    gateway.push_submit(Ok(reply(vec![message(
        &[("Action", "Registered"), ("Symbol", "O")],
        "",
    )])));
    let store = store_with(None);
    let turns = controller(&gateway, &store);

    turns.register().await.unwrap();
    let notice = turns.register_bot().await.unwrap();

    assert_eq!(notice, Some(Notice::BotRegistered));
    let state = store.snapshot();
    assert_eq!(*state.phase(), MatchPhase::Playing);
    assert_eq!(state.players().symbol_of(GAME), Some(Symbol::O));
    assert_eq!(gateway.submitted_actions(), vec!["Register", "Register-Bot"]);
}

#[tokio::test]
async fn test_register_bot_requires_registration() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = store_with(None);

    let err = controller(&gateway, &store).register_bot().await.unwrap_err();

    assert!(matches!(err, TurnError::NotRegistered));
    assert_eq!(gateway.submit_count(), 0);
}

#[tokio::test]
async fn test_occupied_cell_sends_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    let board = r#"[null,null,null,null,"O",null,null,null,null]"#;
    let store = store_with(Some(playing_state(board, ME)));

    let err = controller(&gateway, &store)
        .submit_move(Position::Center)
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::CellOccupied(Position::Center)));
    assert_eq!(gateway.submit_count(), 0);
}

#[tokio::test]
async fn test_not_your_turn_sends_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = store_with(Some(playing_state(EMPTY_BOARD, OPPONENT)));

    let err = controller(&gateway, &store)
        .submit_move(Position::TopLeft)
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::NotYourTurn));
    assert_eq!(err.user_message(), "It's not your turn");
    assert_eq!(gateway.submit_count(), 0);
}

#[tokio::test]
async fn test_no_wallet() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));
    let turns = TurnController::new(gateway.clone(), store.clone(), None);

    assert!(matches!(
        turns.submit_move(Position::TopLeft).await,
        Err(TurnError::NoWallet)
    ));
    assert!(matches!(turns.register().await, Err(TurnError::NoWallet)));
    assert_eq!(gateway.submit_count(), 0);
}

#[tokio::test]
async fn test_move_fills_cell_and_passes_turn() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(reply(vec![message(
        &[("Action", "Current-Turn"), ("Current-Player", OPPONENT)],
        "",
    )])));
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));

    let notice = controller(&gateway, &store)
        .submit_move(Position::Center)
        .await
        .unwrap();

    assert_eq!(notice, None);
    let state = store.snapshot();
    assert_eq!(state.board().get(Position::Center).symbol(), Some(Symbol::X));
    assert!(state.is_turn_of(OPPONENT));

    let submitted = gateway.submitted.lock().unwrap();
    assert_eq!(submitted[0].action.name(), "Make-Move");
    let position = submitted[0]
        .action
        .params()
        .iter()
        .find(|t| t.name == "Position")
        .map(|t| t.value.clone());
    assert_eq!(position.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_winning_move_reports_win() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(reply(vec![message(
        &[("Action", "Winner"), ("Winner", ME)],
        "",
    )])));
    let board = r#"["X","X",null,"O","O",null,null,null,null]"#;
    let store = store_with(Some(playing_state(board, ME)));

    let notice = controller(&gateway, &store)
        .submit_move(Position::TopRight)
        .await
        .unwrap();

    assert_eq!(notice, Some(Notice::YouWon));
    let state = store.snapshot();
    assert_eq!(*state.phase(), MatchPhase::Registering);
    assert!(state.winning_line().is_some());
}

#[tokio::test]
async fn test_rejection_without_messages_changes_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(ActionResult {
        messages: Vec::new(),
        error_output: Some("\u{1b}[31m[string \"aos\"]:42: Invalid move\u{1b}[0m".to_string()),
        error: None,
    }));
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));
    let before = store.snapshot();

    let err = controller(&gateway, &store)
        .submit_move(Position::Center)
        .await
        .unwrap_err();

    match &err {
        TurnError::Gateway(e) => assert!(e.is_rejection()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_message(), "Invalid move");
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_rejection_with_messages_keeps_fill() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Ok(ActionResult {
        messages: vec![message(&[("Action", "Debug")], "")],
        error_output: Some("late failure".to_string()),
        error: None,
    }));
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));

    let err = controller(&gateway, &store)
        .submit_move(Position::BottomLeft)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "late failure");
    assert_eq!(
        store.snapshot().board().get(Position::BottomLeft).symbol(),
        Some(Symbol::X)
    );
}

#[tokio::test]
async fn test_transport_failure_changes_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_submit(Err(GatewayError::remote_call("connection reset")));
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));
    let before = store.snapshot();

    let err = controller(&gateway, &store)
        .submit_move(Position::Center)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Something went wrong, please try again.");
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_registration_closed_during_match() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = store_with(Some(playing_state(EMPTY_BOARD, ME)));

    let err = controller(&gateway, &store).register().await.unwrap_err();

    assert!(matches!(err, TurnError::RegistrationClosed));
    assert_eq!(gateway.submit_count(), 0);
}
