use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_token_starts_uncancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    assert_eq!(token.reason(), None);
    assert!(token.raise_if_cancelled().is_ok());
}

#[test]
fn test_first_reason_wins() {
    let token = CancellationToken::new();
    assert!(token.cancel("ESC pressed"));
    for _ in 0..5 {
        assert!(!token.cancel("something else"));
    }
    assert!(token.is_cancelled());
    assert_eq!(token.reason(), Some("ESC pressed"));

    let err = token.raise_if_cancelled().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.cancel_reason(), Some("ESC pressed"));
}

#[test]
fn test_clones_share_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel("from clone");
    assert!(token.is_cancelled());
    assert!(token.same_as(&clone));
    assert!(!token.same_as(&CancellationToken::new()));
}

#[test]
fn test_cancel_from_other_thread() {
    let token = CancellationToken::new();
    let remote = token.clone();
    thread::spawn(move || remote.cancel(USER_INTERRUPT_REASON))
        .join()
        .unwrap();
    assert_eq!(token.reason(), Some(USER_INTERRUPT_REASON));
}

#[test]
fn test_racing_cancels_have_one_winner() {
    let token = CancellationToken::new();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let token = token.clone();
            thread::spawn(move || token.cancel(format!("thread {i}")))
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert!(token.is_cancelled());
    assert!(token.reason().unwrap().starts_with("thread "));
}

#[test]
fn test_session_mints_fresh_tokens() {
    let session = ExecutionSession::new();
    let first = session.start_new_execution();
    assert!(session.cancel_all("stop"));
    assert!(first.is_cancelled());

    let second = session.start_new_execution();
    assert!(!second.is_cancelled());
    assert!(!second.same_as(&first));
    assert!(session.current_token().same_as(&second));
}

#[test]
fn test_double_cancel_all_is_noop() {
    let session = ExecutionSession::new();
    let token = session.start_new_execution();
    assert!(session.cancel_all("first"));
    assert!(!session.cancel_all("second"));
    assert_eq!(token.reason(), Some("first"));
}

#[test]
fn test_cancel_after_completion_does_not_leak_into_next_query() {
    let session = ExecutionSession::new();
    let finished = session.start_new_execution();
    // query finished; a stale cancel hits the finished token only
    session.cancel_all("late");
    let next = session.start_new_execution();
    assert!(finished.is_cancelled());
    assert!(!next.is_cancelled());
}

#[test]
fn test_no_cross_cancellation_under_concurrency() {
    for _ in 0..200 {
        let session = Arc::new(ExecutionSession::new());
        let old = session.start_new_execution();

        let canceller = {
            let session = session.clone();
            thread::spawn(move || session.cancel_all("race"))
        };
        let starter = {
            let session = session.clone();
            thread::spawn(move || session.start_new_execution())
        };

        let tripped = canceller.join().unwrap();
        let new = starter.join().unwrap();
        assert!(tripped);

        // Exactly one of the tokens was current when cancel_all ran.
        assert!(old.is_cancelled() != new.is_cancelled());
        // The new token is only cancelled if cancel_all ran after it was installed.
        if new.is_cancelled() {
            assert!(!old.is_cancelled());
        }
    }
}
