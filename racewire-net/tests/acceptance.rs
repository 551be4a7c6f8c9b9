//! Acceptance tests for the networking layer.
//!
//! These tests verify:
//! 1. Convergence - a dialing node pulls the remote state on connect
//! 2. Replication - mutations push full state to connected peers
//! 3. Discovery - an announce datagram triggers a session dial
//! 4. Self-filtering - a node's own announce is ignored
//! 5. Clients - state_init on connect, event fan-out, ping/pong
//! 6. Dial idempotency - concurrent dials to one address yield one session

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use tokio_util::codec::FramedRead;

use racewire_core::Flag;
use racewire_net::protocol::messages::{ClientCmd, ClientCommand};
use racewire_net::protocol::{encode_frame, JsonCodec};
use racewire_net::{
    ClientEvent, DiscoveryMessage, Mutation, MutationDispatcher, NetConfig, NetNode,
    SessionManager,
};
use racewire_store::{MemoryBackend, RaceStore};

fn test_config() -> NetConfig {
    NetConfig::new(
        "127.0.0.1:0".parse().unwrap(),
        "127.0.0.1:0".parse().unwrap(),
    )
    .with_discovery(false)
    .with_connect_timeout(Duration::from_secs(2))
}

fn new_store() -> Arc<RaceStore<MemoryBackend>> {
    let store = Arc::new(RaceStore::new(Arc::new(MemoryBackend::new())));
    store.init().unwrap();
    store
}

struct TestNode {
    peer_addr: SocketAddr,
    client_addr: SocketAddr,
    store: Arc<RaceStore<MemoryBackend>>,
    sessions: Arc<SessionManager<MemoryBackend>>,
    dispatcher: Arc<MutationDispatcher<MemoryBackend>>,
    shutdown: broadcast::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

async fn start_node(config: NetConfig) -> TestNode {
    let store = new_store();
    let mut node = NetNode::new(config, store.clone());
    let peer_addr_rx = node.peer_addr_receiver();
    let client_addr_rx = node.client_addr_receiver();
    let sessions = node.sessions();
    let dispatcher = node.dispatcher();
    let shutdown = node.shutdown_handle();

    let handle = tokio::spawn(async move {
        let _ = node.run().await;
    });

    let peer_addr = peer_addr_rx.await.expect("Failed to get peer address");
    let client_addr = client_addr_rx.await.expect("Failed to get client address");

    TestNode {
        peer_addr,
        client_addr,
        store,
        sessions,
        dispatcher,
        shutdown,
        handle,
    }
}

async fn stop_node(node: TestNode) {
    let _ = node.shutdown.send(());
    let _ = timeout(Duration::from_secs(2), node.handle).await;
}

/// Wait for a condition with timeout, polling periodically.
async fn wait_for<F, Fut>(timeout_ms: u64, poll_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout_duration = Duration::from_millis(timeout_ms);
    let poll_duration = Duration::from_millis(poll_ms);

    loop {
        if condition().await {
            return true;
        }
        if start.elapsed() > timeout_duration {
            return false;
        }
        sleep(poll_duration).await;
    }
}

// ============================================================================
// Test 1: Convergence - dialing node pulls the remote state
// ============================================================================

#[tokio::test]
async fn test_dial_pulls_remote_state() {
    let node_a = start_node(test_config()).await;
    node_a
        .dispatcher
        .dispatch(Mutation::RegisterPilot {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            number: "7".into(),
        })
        .await
        .unwrap();
    node_a
        .dispatcher
        .dispatch(Mutation::SetFlag { flag: Flag::Red })
        .await
        .unwrap();

    let node_b = start_node(test_config()).await;
    node_b.sessions.connect(node_a.peer_addr).await.unwrap();

    let store_b = node_b.store.clone();
    let converged = wait_for(5000, 50, || async {
        let snapshot = store_b.read_snapshot().unwrap();
        snapshot.flag == Flag::Red && snapshot.pilot("7").is_some()
    })
    .await;
    assert!(converged, "Node B should pull Node A's state on connect");

    stop_node(node_a).await;
    stop_node(node_b).await;
}

// ============================================================================
// Test 2: Replication - mutations push state to connected peers
// ============================================================================

#[tokio::test]
async fn test_mutation_pushes_state_to_peers() {
    let node_a = start_node(test_config()).await;
    let node_b = start_node(test_config()).await;
    node_b.sessions.connect(node_a.peer_addr).await.unwrap();

    // Wait for A to see the accepted session
    let sessions_a = node_a.sessions.clone();
    assert!(wait_for(5000, 50, || async { sessions_a.session_count().await == 1 }).await);

    node_a
        .dispatcher
        .dispatch(Mutation::SetSectorFlag {
            sector_id: 2,
            flag: Flag::Yellow,
            marshal_intervene: true,
        })
        .await
        .unwrap();

    let store_b = node_b.store.clone();
    let replicated = wait_for(5000, 50, || async {
        let snapshot = store_b.read_snapshot().unwrap();
        snapshot.sector(2).map(|s| s.flag) == Some(Flag::Yellow)
    })
    .await;
    assert!(replicated, "Sector flag should replicate to Node B");

    stop_node(node_a).await;
    stop_node(node_b).await;
}

// ============================================================================
// Test 3 and 4: Discovery listener dials announced peers, skips itself
// ============================================================================

/// Grab a free UDP port by binding port 0 and dropping the socket.
fn free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_announce_triggers_dial() {
    let node_a = start_node(test_config()).await;

    let discovery_port = free_udp_port();
    let node_b = start_node(
        test_config()
            .with_discovery(true)
            .with_discovery_port(discovery_port)
            .with_advertise_host("127.0.0.1")
            .with_announce_interval(Duration::from_secs(60)),
    )
    .await;

    // Give the listener a moment to bind, then announce node A to it
    sleep(Duration::from_millis(100)).await;
    let announce = DiscoveryMessage::BackendAnnounce {
        host: "127.0.0.1".to_string(),
        port: node_a.peer_addr.port(),
    };
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(
            &serde_json::to_vec(&announce).unwrap(),
            ("127.0.0.1", discovery_port),
        )
        .await
        .unwrap();

    let sessions_b = node_b.sessions.clone();
    let dialed = wait_for(5000, 50, || async { sessions_b.session_count().await == 1 }).await;
    assert!(dialed, "Announce should trigger a session dial");

    stop_node(node_a).await;
    stop_node(node_b).await;
}

#[tokio::test]
async fn test_own_announce_is_ignored() {
    let discovery_port = free_udp_port();
    let node = start_node(
        test_config()
            .with_discovery(true)
            .with_discovery_port(discovery_port)
            .with_advertise_host("127.0.0.1")
            .with_announce_interval(Duration::from_secs(60)),
    )
    .await;

    sleep(Duration::from_millis(100)).await;
    let announce = DiscoveryMessage::BackendAnnounce {
        host: "127.0.0.1".to_string(),
        port: node.peer_addr.port(),
    };
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(
            &serde_json::to_vec(&announce).unwrap(),
            ("127.0.0.1", discovery_port),
        )
        .await
        .unwrap();

    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        node.sessions.session_count().await,
        0,
        "A node must not dial itself"
    );

    stop_node(node).await;
}

// ============================================================================
// Test 5: Clients - state_init, event fan-out, ping/pong
// ============================================================================

#[tokio::test]
async fn test_client_receives_init_events_and_pong() {
    let node = start_node(test_config()).await;

    let stream = TcpStream::connect(node.client_addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, JsonCodec::<ClientEvent>::new());

    // First frame is always the full state
    let init = timeout(Duration::from_secs(2), reader.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match init {
        ClientEvent::StateInit { state } => assert_eq!(state.sectors.len(), 3),
        other => panic!("Expected state_init, got {}", other.name()),
    }

    // A mutation reaches the client as a typed event
    node.dispatcher
        .dispatch(Mutation::SetFlag { flag: Flag::Green })
        .await
        .unwrap();
    let event = timeout(Duration::from_secs(2), reader.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match event {
        ClientEvent::FlagChange { flag, state } => {
            assert_eq!(flag, Flag::Green);
            assert_eq!(state.flag, Flag::Green);
        }
        other => panic!("Expected flag_change, got {}", other.name()),
    }

    // Ping gets a pong
    let ping = encode_frame(&ClientCommand { cmd: ClientCmd::Ping }).unwrap();
    write_half.write_all(&ping).await.unwrap();
    let reply = timeout(Duration::from_secs(2), reader.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.name(), "pong");

    stop_node(node).await;
}

// ============================================================================
// Test 6: Dial idempotency
// ============================================================================

#[tokio::test]
async fn test_concurrent_dials_yield_one_session() {
    let node_a = start_node(test_config()).await;
    let node_b = start_node(test_config()).await;

    let (first, second) = tokio::join!(
        node_b.sessions.connect(node_a.peer_addr),
        node_b.sessions.connect(node_a.peer_addr),
    );
    first.unwrap();
    second.unwrap();

    let sessions_b = node_b.sessions.clone();
    assert!(wait_for(5000, 50, || async { sessions_b.session_count().await == 1 }).await);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(node_b.sessions.session_count().await, 1);

    stop_node(node_a).await;
    stop_node(node_b).await;
}
