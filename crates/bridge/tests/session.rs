use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Value, json};

use gymwire::env;
use gymwire::{
    Action, BridgeError, Endpoint, EnvAdapter, EnvClient, Frame, Message, MetadataFrame, Session,
    SessionState,
};

const TIMEOUT: Duration = Duration::from_secs(5);

struct Served {
    result: Result<(), BridgeError>,
    state: SessionState,
    requests: u64,
}

fn spawn_server(io_timeout: Duration) -> (SocketAddr, JoinHandle<Served>) {
    let endpoint = Endpoint::bind("127.0.0.1:0").unwrap();
    let addr = endpoint.local_addr();
    let handle = thread::spawn(move || {
        let env = env::make("CartPole-v1", &json!({}), Some(7)).unwrap();
        let mut session = Session::new(EnvAdapter::new(env, Some(7)));
        let mut channel = endpoint.accept(io_timeout).unwrap();
        let result = session.run(&mut channel);
        session.release();
        channel.close();
        Served {
            result,
            state: session.state(),
            requests: session.requests(),
        }
    });
    (addr, handle)
}

fn op(code: &str) -> Message {
    Message::single(Frame::text(code))
}

fn json_of(message: &Message, index: usize) -> Value {
    message.frames()[index].parse().unwrap()
}

#[test]
fn unknown_operation_then_session_continues() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();

    let reply = client.request(&op("9")).unwrap();
    assert_eq!(json_of(&reply, 0), json!({"error": "Unknown operation"}));

    assert_eq!(client.action_space_str().unwrap(), "Discrete(2)");
    assert!(client.close().unwrap());

    let served = server.join().unwrap();
    assert!(served.result.is_ok());
    assert_eq!(served.requests, 3);
    assert_eq!(served.state, SessionState::Terminated);
}

#[test]
fn render_metadata_is_sent_once() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();
    client.reset().unwrap();

    let first = client.request(&op("6")).unwrap();
    assert_eq!(first.len(), 2);
    let metadata: MetadataFrame = first.frames()[0].parse().unwrap();
    assert_eq!(metadata.shape, vec![400, 600, 3]);
    assert_eq!(metadata.dtype.name(), "uint8");
    assert_eq!(first.frames()[1].payload().len(), 400 * 600 * 3);

    for _ in 0..4 {
        let next = client.request(&op("6")).unwrap();
        assert_eq!(next.len(), 1);
        assert!(next.frames()[0].is_binary());
    }

    client.close().unwrap();
    assert!(server.join().unwrap().result.is_ok());
}

#[test]
fn reset_rearms_state_and_render_metadata() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();

    let first = client.request(&op("4")).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(json_of(&first, 0), json!({"shape": [4], "dtype": "float32"}));
    assert_eq!(client.request(&op("6")).unwrap().len(), 2);

    let second = client.request(&op("4")).unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(client.request(&op("6")).unwrap().len(), 2);

    client.close().unwrap();
    assert!(server.join().unwrap().result.is_ok());
}

#[test]
fn step_reply_has_json_and_one_binary_frame() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();
    client.reset().unwrap();

    let mut request = op("5");
    request.push(Frame::text("1"));
    let reply = client.request(&request).unwrap();
    assert_eq!(reply.len(), 2);
    let head = json_of(&reply, 0);
    assert_eq!(head["reward"], 1.0);
    assert_eq!(head["term"], false);
    assert_eq!(head["trunc"], false);
    assert_eq!(head["info"], json!({}));
    assert!(reply.frames()[1].is_binary());
    assert_eq!(reply.frames()[1].payload().len(), 16);

    let reply = client.request(&op("5")).unwrap();
    assert_eq!(json_of(&reply, 0), json!({"error": "Invalid action"}));

    client.close().unwrap();
    assert!(server.join().unwrap().result.is_ok());
}

#[test]
fn close_reply_ends_the_session() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();
    assert!(client.close().unwrap());
    assert!(server.join().unwrap().result.is_ok());

    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();
    let sample = client.sample_action().unwrap();
    assert!(matches!(sample, Action::Discrete(0 | 1)));
    assert!(client.close().unwrap());
    assert_eq!(server.join().unwrap().requests, 2);
}

#[test]
fn end_to_end_episode() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();

    let reset = client.reset().unwrap();
    assert_eq!(reset.observation.shape(), &[4]);

    for _ in 0..5 {
        let transition = client.step(&Action::Discrete(0)).unwrap();
        assert_eq!(transition.observation.shape(), &[4]);
        let frame = client.render().unwrap();
        assert_eq!(frame.shape(), &[400, 600, 3]);
        if transition.done() {
            break;
        }
    }

    let counts = client.metadata_counts();
    assert_eq!(counts.state, 1);
    assert_eq!(counts.render, 1);
    assert!(client.close().unwrap());

    let stats = client.disconnect();
    assert!(stats.messages_sent >= 3);
    assert_eq!(stats.messages_sent, stats.messages_received);

    let served = server.join().unwrap();
    assert!(served.result.is_ok());
    assert_eq!(served.state, SessionState::Terminated);
}

#[test]
fn idle_client_times_out_the_session() {
    let (addr, server) = spawn_server(Duration::from_millis(200));
    let client = EnvClient::connect(addr, TIMEOUT).unwrap();

    let served = server.join().unwrap();
    assert!(matches!(served.result, Err(BridgeError::Timeout)));
    assert_eq!(served.state, SessionState::Terminated);
    drop(client);
}

#[test]
fn step_before_reset_ends_the_session() {
    let (addr, server) = spawn_server(TIMEOUT);
    let mut client = EnvClient::connect(addr, TIMEOUT).unwrap();

    let mut request = op("5");
    request.push(Frame::text("0"));
    assert!(client.request(&request).is_err());

    let served = server.join().unwrap();
    assert!(matches!(served.result, Err(BridgeError::Adapter(_))));
}

#[test]
fn client_disconnect_is_reported() {
    let (addr, server) = spawn_server(TIMEOUT);
    let client = EnvClient::connect(addr, TIMEOUT).unwrap();
    client.disconnect();

    let served = server.join().unwrap();
    assert!(matches!(served.result, Err(BridgeError::PeerDisconnected)));
}
