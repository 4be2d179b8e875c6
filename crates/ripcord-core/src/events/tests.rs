use super::*;
use crate::agent::AgentState;
use parking_lot::Mutex;
use std::time::Duration;

fn recorder() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn test_sync_handlers_run_in_subscription_order() {
    let bus = EventBus::new();
    let log = recorder();

    for name in ["first", "second", "third"] {
        let log = log.clone();
        bus.subscribe(EventType::ToolSelected, move |_| {
            log.lock().push(name.to_string());
            Ok(())
        });
    }

    let delivered = bus.emit(Event::tool_selected("bash", "call-1")).await;
    assert_eq!(delivered, 3);
    assert_eq!(*log.lock(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_sync_phase_completes_before_async_phase() {
    let bus = EventBus::new();
    let log = recorder();

    let async_log = log.clone();
    bus.subscribe_async(EventType::ToolCompleted, move |_| {
        let log = async_log.clone();
        async move {
            log.lock().push("async".to_string());
            Ok(())
        }
    });
    let sync_log = log.clone();
    bus.subscribe(EventType::ToolCompleted, move |_| {
        sync_log.lock().push("sync".to_string());
        Ok(())
    });

    bus.emit(Event::tool_completed("bash", true, Some(0))).await;
    assert_eq!(*log.lock(), vec!["sync", "async"]);
}

#[tokio::test]
async fn test_emit_awaits_async_handlers() {
    let bus = EventBus::new();
    let log = recorder();

    let slow_log = log.clone();
    bus.subscribe_async(EventType::ExecutionCancelled, move |event| {
        let log = slow_log.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            log.lock()
                .push(event.get_str("reason").unwrap_or_default().to_string());
            Ok(())
        }
    });

    bus.emit(Event::execution_cancelled("ESC pressed")).await;
    assert_eq!(*log.lock(), vec!["ESC pressed"]);
}

#[tokio::test]
async fn test_failing_handler_is_isolated() {
    let bus = EventBus::new();
    let log = recorder();

    bus.subscribe(EventType::ToolError, |_| anyhow::bail!("renderer exploded"));
    bus.subscribe(EventType::ToolError, |_| panic!("handler bug"));
    bus.subscribe_async(EventType::ToolError, |_| async {
        Err::<(), _>(anyhow::anyhow!("async failure"))
    });
    let ok_log = log.clone();
    bus.subscribe(EventType::ToolError, move |_| {
        ok_log.lock().push("still delivered".to_string());
        Ok(())
    });

    let delivered = bus.emit(Event::tool_error("bash", "boom")).await;
    assert_eq!(delivered, 1);
    assert_eq!(*log.lock(), vec!["still delivered"]);
}

#[tokio::test]
async fn test_unsubscribe() {
    let bus = EventBus::new();
    let log = recorder();

    let handler_log = log.clone();
    let id = bus.subscribe(EventType::UserInputPaused, move |_| {
        handler_log.lock().push("paused".to_string());
        Ok(())
    });
    assert_eq!(bus.handler_count(EventType::UserInputPaused), 1);

    assert!(bus.unsubscribe(EventType::UserInputPaused, id));
    assert!(!bus.unsubscribe(EventType::UserInputPaused, id));
    assert!(!bus.unsubscribe(EventType::ToolSelected, id));

    assert_eq!(bus.emit(Event::user_input_paused()).await, 0);
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_dispatch_is_keyed_by_type() {
    let bus = EventBus::new();
    let log = recorder();

    let handler_log = log.clone();
    bus.subscribe(EventType::PermissionResolved, move |event| {
        handler_log
            .lock()
            .push(format!("granted={:?}", event.get_bool("granted")));
        Ok(())
    });

    bus.emit(Event::permission_requested("bash", "run rm?")).await;
    bus.emit(Event::permission_resolved("bash", true)).await;
    assert_eq!(*log.lock(), vec!["granted=Some(true)"]);
}

#[tokio::test]
async fn test_handler_may_subscribe_during_dispatch() {
    let bus = EventBus::new();
    let inner_bus = bus.clone();
    bus.subscribe(EventType::UserInputResumed, move |_| {
        inner_bus.subscribe(EventType::UserInputResumed, |_| Ok(()));
        Ok(())
    });

    assert_eq!(bus.emit(Event::user_input_resumed()).await, 1);
    assert_eq!(bus.handler_count(EventType::UserInputResumed), 2);
}

#[test]
fn test_agent_state_payload_round_trips() {
    let event = Event::agent_state_changed(AgentState::UsingTool, Some("bash"));
    assert_eq!(event.event_type(), EventType::AgentStateChanged);
    assert_eq!(event.agent_state(), Some(AgentState::UsingTool));
    assert_eq!(event.get_str("tool"), Some("bash"));
    assert_eq!(event.source(), "agent");
}

#[test]
fn test_event_type_names() {
    let names: Vec<_> = EventType::ALL.iter().map(|t| t.as_str()).collect();
    assert_eq!(names.len(), 10);
    assert!(names.contains(&"tool_output_chunk"));
    assert_eq!(EventType::ExecutionCancelled.to_string(), "execution_cancelled");
}
