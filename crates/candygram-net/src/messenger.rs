//! Session orchestration for one local identity.
//!
//! A published line fans out to one encrypt-and-send worker per friend;
//! inbound fragments fan in through one reassembly worker per friend.
//! `publish` blocks until every worker has dequeued and attempted delivery
//! for that line, so the caller sees one all-attempts-complete point per
//! published message rather than per-recipient completion.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, warn};

use candygram_shared::{wire, Identity, Message, Reassembler};

use crate::error::MessengerError;
use crate::friend::Friend;
use crate::print::Printer;
use crate::transport::Transport;

/// Queue depth for each friend's outbound and inbound channel
pub const CHANNEL_DEPTH: usize = 16;

/// Build one inbound channel per friend that has a datagram address.
/// The sender halves, keyed by IP, become the datagram transport's
/// dispatch table; the receiver halves feed the reassembly workers.
#[allow(clippy::type_complexity)]
pub fn inbound_channels(
    friends: &[Arc<Friend>],
) -> (
    HashMap<IpAddr, mpsc::Sender<Vec<u8>>>,
    Vec<(Arc<Friend>, mpsc::Receiver<Vec<u8>>)>,
) {
    let mut routes = HashMap::new();
    let mut receivers = Vec::new();
    for friend in friends {
        let Some(address) = friend.address else {
            warn!(friend = %friend.name, "no datagram address, cannot receive from them");
            continue;
        };
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        routes.insert(address.ip(), tx);
        receivers.push((friend.clone(), rx));
    }
    (routes, receivers)
}

pub struct Messenger {
    identity: Arc<Identity>,
    transport: Arc<dyn Transport>,
    printer: Printer,
    friends: Vec<Arc<Friend>>,
    outbound: Vec<mpsc::Sender<Message>>,
    outbound_rx: Vec<(Arc<Friend>, mpsc::Receiver<Message>)>,
    inbound_rx: Vec<(Arc<Friend>, mpsc::Receiver<Vec<u8>>)>,
    done_tx: mpsc::Sender<()>,
    done_rx: mpsc::Receiver<()>,
    send_workers: JoinSet<()>,
}

impl Messenger {
    /// Wire up a session. `inbound` is empty in relay mode, where the
    /// transport's read loop delivers messages itself.
    pub fn new(
        identity: Arc<Identity>,
        friends: Vec<Arc<Friend>>,
        transport: Arc<dyn Transport>,
        inbound: Vec<(Arc<Friend>, mpsc::Receiver<Vec<u8>>)>,
        printer: Printer,
    ) -> Self {
        let mut outbound = Vec::with_capacity(friends.len());
        let mut outbound_rx = Vec::with_capacity(friends.len());
        for friend in &friends {
            let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
            outbound.push(tx);
            outbound_rx.push((friend.clone(), rx));
        }
        let (done_tx, done_rx) = mpsc::channel(CHANNEL_DEPTH.max(friends.len()));
        Self {
            identity,
            transport,
            printer,
            friends,
            outbound,
            outbound_rx,
            inbound_rx: inbound,
            done_tx,
            done_rx,
            send_workers: JoinSet::new(),
        }
    }

    pub fn friends(&self) -> &[Arc<Friend>] {
        &self.friends
    }

    pub fn printer(&self) -> Printer {
        self.printer.clone()
    }

    /// Start one send worker per friend. Workers run for the session
    /// lifetime, draining their friend's outbound queue.
    pub fn outbound_connect(&mut self) {
        for (friend, queue) in self.outbound_rx.drain(..) {
            self.send_workers.spawn(send_and_report(
                friend,
                queue,
                self.transport.clone(),
                self.printer.clone(),
                self.done_tx.clone(),
            ));
        }
    }

    /// Sign `text` once, enqueue it to every friend, and block until every
    /// worker has dequeued and attempted delivery for this call.
    pub async fn publish(&mut self, text: &str) -> Result<(), MessengerError> {
        let mut message = Message::new(text.as_bytes().to_vec(), &self.identity);
        message.sign(&self.identity)?;

        for (friend, queue) in self.friends.iter().zip(&self.outbound) {
            queue
                .send(message.clone())
                .await
                .map_err(|_| MessengerError::WorkerGone(friend.name.clone()))?;
        }
        for _ in 0..self.outbound.len() {
            if self.done_rx.recv().await.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Run the inbound side: the transport's receive loop plus one
    /// reassembly worker per friend. A signature-verification failure in
    /// any worker surfaces here as an error; the caller is expected to
    /// treat it as process-terminating.
    pub async fn read_loop(&mut self) -> Result<(), MessengerError> {
        let mut workers: JoinSet<Result<(), MessengerError>> = JoinSet::new();
        for (friend, queue) in self.inbound_rx.drain(..) {
            workers.spawn(inbound_worker(
                friend,
                queue,
                self.identity.clone(),
                self.printer.clone(),
            ));
        }

        self.printer.line("Listening for messages...").await;
        let transport = self.transport.clone();
        tokio::select! {
            result = transport.read() => result.map_err(MessengerError::from),
            Some(joined) = workers.join_next() => match joined {
                Ok(result) => result,
                Err(join_error) => Err(MessengerError::WorkerPanic(join_error.to_string())),
            },
        }
    }
}

/// Drain one friend's outbound queue: encrypt, encode, write, report.
/// Failures on a single message are reported and the worker moves on.
async fn send_and_report(
    friend: Arc<Friend>,
    mut queue: mpsc::Receiver<Message>,
    transport: Arc<dyn Transport>,
    printer: Printer,
    done: mpsc::Sender<()>,
) {
    while let Some(message) = queue.recv().await {
        let outcome = deliver(&friend, message, transport.as_ref()).await;
        printer.report_delivery(&friend.name, &outcome).await;
        if done.send(()).await.is_err() {
            break;
        }
    }
}

async fn deliver(
    friend: &Friend,
    mut message: Message,
    transport: &dyn Transport,
) -> Result<(), MessengerError> {
    message.encrypt(&friend.public_key)?;
    let encoded = wire::encode_message(&message)?;
    transport.write(friend, &encoded).await?;
    Ok(())
}

/// Drain one friend's inbound queue of raw gram bytes. Undecodable grams,
/// undecodable messages, and decryption failures drop the offending
/// message and keep the worker alive; a signature that does not verify is
/// unrecoverable and ends the session.
async fn inbound_worker(
    friend: Arc<Friend>,
    mut queue: mpsc::Receiver<Vec<u8>>,
    identity: Arc<Identity>,
    printer: Printer,
) -> Result<(), MessengerError> {
    let mut reassembler = Reassembler::new();
    while let Some(raw) = queue.recv().await {
        let gram = match wire::decode_gram(&raw) {
            Ok(gram) => gram,
            Err(error) => {
                warn!(friend = %friend.name, %error, "dropping undecodable gram");
                continue;
            }
        };
        let Some(encoded) = reassembler.push(gram) else {
            continue;
        };
        let mut message = match wire::decode_message(&encoded) {
            Ok(message) => message,
            Err(error) => {
                warn!(friend = %friend.name, %error, "dropping undecodable message");
                continue;
            }
        };
        if let Err(error) = message.decrypt(&identity) {
            warn!(friend = %friend.name, %error, "could not decrypt message");
            continue;
        }
        if !message.verify_signature() {
            error!(friend = %friend.name, "message failed signature verification");
            return Err(MessengerError::SignatureMismatch {
                name: friend.name.clone(),
            });
        }
        printer.show_message(&friend.name, &message.content).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::TransportError;
    use candygram_shared::gram;

    /// Records every write and never finishes reading, like a healthy
    /// long-lived transport.
    #[derive(Default)]
    struct RecordingTransport {
        writes: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn write(&self, friend: &Friend, payload: &[u8]) -> Result<(), TransportError> {
            self.writes
                .lock()
                .unwrap()
                .push((friend.name.clone(), payload.to_vec()));
            if self.fail {
                return Err(TransportError::NoAddress(friend.name.clone()));
            }
            Ok(())
        }

        async fn read(&self) -> Result<(), TransportError> {
            std::future::pending().await
        }
    }

    fn identities() -> (Arc<Identity>, Arc<Identity>) {
        (
            Arc::new(Identity::generate().unwrap()),
            Arc::new(Identity::generate().unwrap()),
        )
    }

    fn friends_named(names: &[&str], key_text: &str) -> Vec<Arc<Friend>> {
        names
            .iter()
            .map(|name| Arc::new(Friend::new(*name, key_text, None).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_publish_barrier_counts_every_attempt() {
        let (alice, bob) = identities();
        let friends = friends_named(&["f1", "f2", "f3"], &bob.public_text());
        let transport = Arc::new(RecordingTransport::default());

        let mut messenger = Messenger::new(
            alice,
            friends,
            transport.clone(),
            Vec::new(),
            Printer::new(),
        );
        messenger.outbound_connect();

        for round in 1..=4 {
            messenger.publish(&format!("line {round}")).await.unwrap();
            // the barrier: by the time publish returns, all three attempts
            // for this call have been made
            assert_eq!(transport.writes.lock().unwrap().len(), round * 3);
        }

        let writes = transport.writes.lock().unwrap();
        for name in ["f1", "f2", "f3"] {
            assert_eq!(writes.iter().filter(|(n, _)| n == name).count(), 4);
        }
    }

    #[tokio::test]
    async fn test_publish_completes_when_delivery_fails() {
        let (alice, bob) = identities();
        let friends = friends_named(&["f1", "f2"], &bob.public_text());
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });

        let mut messenger = Messenger::new(
            alice,
            friends,
            transport.clone(),
            Vec::new(),
            Printer::new(),
        );
        messenger.outbound_connect();

        // failures are reported, not retried; publish still returns
        tokio::time::timeout(Duration::from_secs(5), messenger.publish("doomed"))
            .await
            .expect("publish must not hang on failures")
            .unwrap();
        assert_eq!(transport.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_published_payload_decrypts_for_recipient() {
        let (alice, bob) = identities();
        let friends = friends_named(&["bob"], &bob.public_text());
        let transport = Arc::new(RecordingTransport::default());

        let mut messenger = Messenger::new(
            alice.clone(),
            friends,
            transport.clone(),
            Vec::new(),
            Printer::new(),
        );
        messenger.outbound_connect();
        messenger.publish("hello").await.unwrap();

        let writes = transport.writes.lock().unwrap();
        let mut message = wire::decode_message(&writes[0].1).unwrap();
        message.decrypt(&bob).unwrap();
        assert_eq!(message.content, b"hello");
        assert!(message.verify_signature());
        assert_eq!(message.sender_text(), alice.public_text());
    }

    /// Encode a full message as wire-ready gram datagrams.
    fn gram_bytes_for(message: &Message) -> Vec<Vec<u8>> {
        gram::split(&wire::encode_message(message).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_inbound_reassembles_and_survives_junk() {
        let (alice, bob) = identities();
        let friends = friends_named(&["alice"], &alice.public_text());

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let inbound = vec![(friends[0].clone(), rx)];
        let mut messenger = Messenger::new(
            bob.clone(),
            friends,
            Arc::new(RecordingTransport::default()),
            inbound,
            Printer::new(),
        );

        let handle = tokio::spawn(async move { messenger.read_loop().await });

        // junk first: logged and dropped, loop stays up
        tx.send(vec![0xFF, 0xFF, 0xFF]).await.unwrap();

        // then a real multi-gram message
        let mut message = Message::new(&b"a line long enough to need several grams"[..], &alice);
        message.sign(&alice).unwrap();
        message.encrypt(&bob.public_key()).unwrap();
        for datagram in gram_bytes_for(&message) {
            tx.send(datagram).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished(), "read loop must survive good traffic");
        handle.abort();
    }

    #[tokio::test]
    async fn test_forged_signature_is_fatal() {
        let (alice, bob) = identities();
        let friends = friends_named(&["alice"], &alice.public_text());

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let inbound = vec![(friends[0].clone(), rx)];
        let mut messenger = Messenger::new(
            bob.clone(),
            friends,
            Arc::new(RecordingTransport::default()),
            inbound,
            Printer::new(),
        );

        let handle = tokio::spawn(async move { messenger.read_loop().await });

        // signed garbage: valid envelope, signature does not match content
        let mut message = Message::new(&b"legit"[..], &alice);
        message.sign(&alice).unwrap();
        message.content = b"tampered".to_vec();
        message.encrypt(&bob.public_key()).unwrap();
        for datagram in gram_bytes_for(&message) {
            tx.send(datagram).await.unwrap();
        }

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("read loop must end on a forged signature")
            .unwrap();
        assert!(matches!(
            result,
            Err(MessengerError::SignatureMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_inbound_channels_skip_addressless_friends() {
        let (_, bob) = identities();
        let with_addr = Arc::new(
            Friend::new(
                "near",
                &bob.public_text(),
                Some("10.0.0.7:9000".parse().unwrap()),
            )
            .unwrap(),
        );
        let without = Arc::new(Friend::new("far", &bob.public_text(), None).unwrap());

        let (routes, receivers) = inbound_channels(&[with_addr, without]);
        assert_eq!(routes.len(), 1);
        assert_eq!(receivers.len(), 1);
        assert!(routes.contains_key(&"10.0.0.7".parse::<IpAddr>().unwrap()));
    }
}
