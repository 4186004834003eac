#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use relay_engines::clock::Clock;
use relay_engines::http_transport::{HttpReply, PushHttpTransport, TransportError};
use relay_engines::intent_parser::KeywordIntentParser;
use relay_engines::push_dispatch::{PushDispatcher, PushDispatcherConfig};
use relay_kernel_contracts::push::{PushConfig, ServiceCredential};
use relay_kernel_contracts::voice::VoiceSessionState;
use relay_os::capabilities::VoiceCapabilities;
use relay_os::remote_trigger::PushIntentSubmitter;
use relay_os::voice_session::{VoiceSession, VoiceSessionConfig, MSG_SENT, MSG_SUBMIT_FAILED};
use relay_storage::config_store::ConfigStore;
use relay_storage::contacts::{ContactBook, ContactDirectory};
use relay_storage::kv::{FileKeyValueStore, MemoryKeyValueStore};
use relay_tools::console::{ConsoleCapture, ConsoleSpeech};
use relay_tools::trigger_cli::report_voice_outcome;
use serde_json::Value;

const TEST_KEY_PEM: &str =
    include_str!("../../relay_engines/tests/fixtures/test_service_key.pem");

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeTransport {
    replies: Mutex<VecDeque<HttpReply>>,
    pushed: Mutex<Vec<Value>>,
}

impl FakeTransport {
    fn reply(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(HttpReply {
            status,
            body: body.to_string(),
        });
    }

    fn next(&self) -> HttpReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }
}

impl PushHttpTransport for FakeTransport {
    fn post_form(
        &self,
        _url: &str,
        _form: &[(&str, &str)],
    ) -> Result<HttpReply, TransportError> {
        Ok(self.next())
    }

    fn post_json(
        &self,
        _url: &str,
        _bearer_token: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        self.pushed.lock().unwrap().push(body.clone());
        Ok(self.next())
    }
}

struct FixedClock;

impl Clock for FixedClock {
    fn now_unix_ms(&self) -> u64 {
        1_700_000_000_000
    }
}

struct Console {
    session: VoiceSession,
    transport: Arc<FakeTransport>,
    contacts: Arc<ContactBook<FileKeyValueStore>>,
    spoken: SharedBuffer,
    _dir: tempfile::TempDir,
}

fn console(script: &'static str) -> Console {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(
        FileKeyValueStore::new(dir.path()),
        MemoryKeyValueStore::new(),
    );
    let config = PushConfig::v1(
        ServiceCredential {
            project_id: "relay-test".into(),
            private_key_pem: TEST_KEY_PEM.into(),
            client_email: "relay@relay-test.iam.gserviceaccount.com".into(),
            private_key_id: None,
            client_id: None,
            token_uri: None,
        },
        "device-token-1",
    )
    .unwrap();
    store.save(&config, None).unwrap();

    let transport = Arc::new(FakeTransport::default());
    let dispatcher = PushDispatcher::new(
        PushDispatcherConfig::mvp_v1(),
        transport.clone(),
        FixedClock,
    );
    let contacts = Arc::new(ContactBook::new(FileKeyValueStore::new(dir.path())));
    let spoken = SharedBuffer::default();
    let caps = VoiceCapabilities {
        capture: Arc::new(ConsoleCapture::new(Cursor::new(script), io::sink())),
        speech: Arc::new(ConsoleSpeech::new(spoken.clone())),
        parser: Arc::new(KeywordIntentParser::new().unwrap()),
        contacts: contacts.clone(),
        submitter: Arc::new(PushIntentSubmitter::new(store, dispatcher)),
    };
    Console {
        session: VoiceSession::new(VoiceSessionConfig::mvp_v1(), caps),
        transport,
        contacts,
        spoken,
        _dir: dir,
    }
}

#[test]
fn at_console_voice_01_spoken_send_reaches_the_phone_once() {
    let c = console("send 500 on 0712345678 to Mama\nyes\n");
    c.transport
        .reply(200, r#"{"access_token":"ya29.token","expires_in":3599}"#);
    c.transport
        .reply(200, r#"{"name":"projects/relay-test/messages/1"}"#);

    let outcome = c.session.start();
    assert_eq!(report_voice_outcome(&outcome).unwrap(), "submitted SEND_MONEY");

    let pushed = c.transport.pushed.lock().unwrap().clone();
    assert_eq!(pushed.len(), 1);
    let body: Value =
        serde_json::from_str(pushed[0]["message"]["data"]["body"].as_str().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"mode": "SEND_MONEY", "amount": "500", "phone": "0712345678"})
    );

    let spoken = c.spoken.text();
    assert!(spoken.starts_with(
        "Send KES 500 to 0712345678. Say yes to confirm, or no to cancel.\n"
    ));
    assert!(spoken.ends_with(&format!("{MSG_SENT}\n")));
    assert_eq!(
        c.contacts.resolve_by_phone_or_name("mama").as_deref(),
        Some("0712345678")
    );
    assert_eq!(c.session.snapshot().state, VoiceSessionState::Idle);
}

#[test]
fn at_console_voice_02_rejected_push_is_reported_as_unreachable() {
    let c = console("send 500 to 0712345678\nok\n");
    c.transport.reply(401, r#"{"error":"invalid_grant"}"#);

    let outcome = c.session.start();
    assert!(report_voice_outcome(&outcome).is_err());
    assert!(c.transport.pushed.lock().unwrap().is_empty());
    assert!(c.spoken.text().ends_with(&format!("{MSG_SUBMIT_FAILED}\n")));
    assert_eq!(c.session.snapshot().state, VoiceSessionState::Error);
}

#[test]
fn at_console_voice_03_end_of_input_at_confirmation_submits_nothing() {
    let c = console("pay till 522533 200\n");

    let outcome = c.session.start();
    assert_eq!(report_voice_outcome(&outcome).unwrap(), "cancelled");
    assert!(c.transport.pushed.lock().unwrap().is_empty());
    assert_eq!(
        c.session.snapshot().pending,
        Some(relay_kernel_contracts::intent::TransactionIntent::Till {
            amount: "200".into(),
            till_number: "522533".into(),
        })
    );
}
