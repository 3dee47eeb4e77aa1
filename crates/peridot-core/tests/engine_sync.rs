//! End-to-end engine tests over in-memory transports.

use kurbo::Point;
use peridot_core::protocol::encode;
use peridot_core::{
    Action, ConnectionState, Engine, EngineConfig, EngineEvent, MemoryPeer, MemoryTransport,
    PackedColor, SessionId, Surface, WireMessage,
};
use std::thread;
use std::time::{Duration, Instant};

fn config(client_id: &str) -> EngineConfig {
    EngineConfig {
        canvas_width: 120,
        canvas_height: 80,
        client_id: Some(client_id.to_string()),
        ..EngineConfig::default()
    }
}

fn engine(client_id: &str, evict: bool) -> (Engine<MemoryTransport>, MemoryPeer) {
    let transport = MemoryTransport::new();
    let peer = transport.peer();
    let config = EngineConfig {
        evict_on_disconnect: evict,
        ..config(client_id)
    };
    (Engine::new(&config, transport), peer)
}

/// Connect an engine and let its transport acknowledge.
fn online(engine: &mut Engine<MemoryTransport>, peer: &MemoryPeer) {
    engine.connect().unwrap();
    assert!(peer.accept());
    engine.process_pending();
    assert_eq!(engine.connection_state(), ConnectionState::Connected);
}

fn draw(uuid: &str, action: Action, x: f64, y: f64) -> String {
    encode(&WireMessage::draw(uuid, action, 4.0, PackedColor::RED, Point::new(x, y)))
}

fn white(engine: &Engine<MemoryTransport>) -> bool {
    engine
        .surface()
        .bitmap()
        .pixels()
        .all(|p| p.0 == PackedColor::WHITE.to_rgba8())
}

#[test]
fn test_remote_peer_reconstructs_local_stroke() {
    let (mut alice, alice_net) = engine("alice", false);
    let (mut bob, bob_net) = engine("bob", false);
    online(&mut alice, &alice_net);
    online(&mut bob, &bob_net);

    alice.set_pen_color(PackedColor::RED);
    alice.on_pen_width_changed(5.0);
    let samples = [
        (Action::Down, 10.0, 10.0),
        (Action::Move, 25.0, 18.0),
        (Action::Move, 40.0, 30.0),
        (Action::Move, 60.0, 35.0),
        (Action::Move, 80.0, 50.0),
        (Action::Move, 95.0, 52.0),
        (Action::Up, 110.0, 70.0),
    ];
    for (action, x, y) in samples {
        alice.on_local_point(action, Point::new(x, y));
    }

    let frames = alice_net.take_sent();
    assert_eq!(frames.len(), samples.len());
    for frame in frames {
        assert!(bob_net.deliver(frame));
    }
    bob.process_pending();

    assert!(!white(&bob));
    assert_eq!(alice.surface().bitmap(), bob.surface().bitmap());
    assert!(bob.sessions().is_empty());
}

#[test]
fn test_local_points_not_sent_while_offline() {
    let (mut alice, alice_net) = engine("alice", false);
    alice.on_local_point(Action::Down, Point::new(1.0, 1.0));
    alice.clear();
    assert!(alice_net.sent().is_empty());
}

#[test]
fn test_erase_sends_background_color() {
    let (mut alice, alice_net) = engine("alice", false);
    online(&mut alice, &alice_net);
    alice.set_pen_color(PackedColor::RED);
    alice.set_mode(peridot_core::InputMode::Erase);
    alice.on_local_point(Action::Down, Point::new(1.0, 1.0));

    let sent = alice_net.take_sent();
    let message = peridot_core::protocol::decode(&sent[0]).unwrap();
    match message {
        WireMessage::Draw(draw) => assert_eq!(draw.color, PackedColor::WHITE),
        other => panic!("Wrong message type: {:?}", other),
    }
}

#[test]
fn test_interleaved_remote_strokes_stay_isolated() {
    let (mut bob, bob_net) = engine("bob", false);
    online(&mut bob, &bob_net);

    bob_net.deliver(draw("p1", Action::Down, 10.0, 10.0));
    bob_net.deliver(draw("p2", Action::Down, 10.0, 60.0));
    bob_net.deliver(draw("p1", Action::Move, 20.0, 10.0));
    bob_net.deliver(draw("p2", Action::Move, 20.0, 60.0));
    bob.process_pending();

    let p1 = bob.sessions().session(&SessionId::remote("p1")).unwrap();
    let p2 = bob.sessions().session(&SessionId::remote("p2")).unwrap();
    assert_eq!(p1.buffered(), &[Point::new(10.0, 10.0), Point::new(20.0, 10.0)]);
    assert_eq!(p2.buffered(), &[Point::new(10.0, 60.0), Point::new(20.0, 60.0)]);

    bob_net.deliver(draw("p1", Action::Up, 30.0, 10.0));
    bob.process_pending();
    assert!(!bob.sessions().is_active(&SessionId::remote("p1")));
    assert!(bob.sessions().is_active(&SessionId::remote("p2")));
    assert_eq!(bob.surface().pixel_color(Point::new(20.0, 10.0)), Some(PackedColor::RED));
    assert_eq!(bob.surface().pixel_color(Point::new(20.0, 60.0)), Some(PackedColor::WHITE));
}

#[test]
fn test_decode_error_is_dropped() {
    let (mut bob, bob_net) = engine("bob", false);
    let events = bob.subscribe();
    online(&mut bob, &bob_net);

    bob_net.deliver(r#"{"type":"paint","uuid":"p1","action":0,"width":4.0,"color":0,"x":1.0,"y":1.0}"#);
    bob_net.deliver("garbage");
    bob_net.deliver(draw("p1", Action::Down, 5.0, 5.0));
    bob.process_pending();

    let failures: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::DecodeFailed(_)))
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(bob.sessions().is_active(&SessionId::remote("p1")));
    assert_eq!(bob.sessions().len(), 1);
    assert_eq!(bob.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_far_remote_points_processed_promptly() {
    let (mut bob, bob_net) = engine("bob", false);
    online(&mut bob, &bob_net);

    let started = Instant::now();
    for (uuid, far) in [("p1", 1e300), ("p2", 1e9)] {
        bob_net.deliver(draw(uuid, Action::Down, 0.0, 0.0));
        bob_net.deliver(draw(uuid, Action::Move, far, 0.0));
        bob_net.deliver(draw(uuid, Action::Move, 10.0, 10.0));
        bob_net.deliver(draw(uuid, Action::Move, far, far));
        bob_net.deliver(draw(uuid, Action::Up, 20.0, 10.0));
    }
    assert_eq!(bob.process_pending(), 10);

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(bob.sessions().is_empty());
    assert_eq!(bob.surface().pixel_color(Point::new(10.0, 10.0)), Some(PackedColor::RED));
    assert_eq!(bob.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_remote_clear_keeps_active_session() {
    let (mut bob, bob_net) = engine("bob", false);
    online(&mut bob, &bob_net);

    bob_net.deliver(draw("p1", Action::Down, 10.0, 10.0));
    bob_net.deliver(draw("p1", Action::Move, 20.0, 10.0));
    bob_net.deliver(draw("p1", Action::Move, 30.0, 10.0));
    bob_net.deliver(encode(&WireMessage::clear("p2")));
    bob.process_pending();
    assert!(white(&bob));

    bob_net.deliver(draw("p1", Action::Move, 40.0, 10.0));
    bob_net.deliver(draw("p1", Action::Move, 50.0, 10.0));
    bob.process_pending();
    assert_eq!(bob.surface().pixel_color(Point::new(40.0, 10.0)), Some(PackedColor::RED));
}

#[test]
fn test_peer_drop_keeps_sessions_by_default() {
    let (mut bob, bob_net) = engine("bob", false);
    let events = bob.subscribe();
    online(&mut bob, &bob_net);

    bob_net.deliver(draw("p1", Action::Down, 10.0, 10.0));
    bob_net.hang_up(1001, "going away");
    bob.process_pending();

    assert_eq!(bob.connection_state(), ConnectionState::Disconnected);
    assert!(bob.sessions().is_active(&SessionId::remote("p1")));
    let states: Vec<_> = events.try_iter().collect();
    assert_eq!(states, vec![
        EngineEvent::ConnectionChanged(ConnectionState::Connecting),
        EngineEvent::ConnectionChanged(ConnectionState::Connected),
        EngineEvent::ConnectionChanged(ConnectionState::Disconnected),
    ]);
}

#[test]
fn test_evict_on_disconnect() {
    let (mut bob, bob_net) = engine("bob", true);
    online(&mut bob, &bob_net);
    bob.on_local_point(Action::Down, Point::new(5.0, 5.0));
    bob_net.deliver(draw("p1", Action::Down, 10.0, 10.0));
    bob.process_pending();

    bob.disconnect();
    assert!(!bob.sessions().is_active(&SessionId::remote("p1")));
    assert!(bob.sessions().is_active(&SessionId::Local));
}

#[test]
fn test_reconnect_after_failure() {
    let (mut bob, bob_net) = engine("bob", false);
    bob.connect().unwrap();
    bob_net.fail("connection refused");
    bob.process_pending();
    assert_eq!(bob.connection_state(), ConnectionState::Disconnected);

    online(&mut bob, &bob_net);
    assert_eq!(bob_net.opened_urls().len(), 2);
}

#[test]
fn test_run_on_executor_thread() {
    let (mut bob, bob_net) = engine("bob", false);
    let handle = bob.handle();

    let executor = thread::spawn(move || {
        bob.run();
        bob
    });

    handle.connect();
    // The open acknowledgment arrives from the transport side.
    while bob_net.opened_urls().is_empty() {
        thread::yield_now();
    }
    bob_net.accept();
    let from_network = thread::spawn({
        let net = bob_net.clone();
        move || {
            net.deliver(draw("p1", Action::Down, 10.0, 10.0));
            net.deliver(draw("p1", Action::Move, 20.0, 10.0));
            net.deliver(draw("p1", Action::Up, 30.0, 10.0));
        }
    });
    from_network.join().unwrap();
    handle.on_local_point(Action::Down, Point::new(60.0, 40.0));
    handle.shutdown();

    let bob = executor.join().unwrap();
    assert_eq!(bob.surface().pixel_color(Point::new(20.0, 10.0)), Some(PackedColor::RED));
    assert_eq!(bob.connection_state(), ConnectionState::Disconnected);
    assert!(bob.sessions().is_active(&SessionId::Local));
}
