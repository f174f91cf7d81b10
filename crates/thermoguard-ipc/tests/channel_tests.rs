//! Behavioral tests for channels and routing.

#![cfg(test)]

use std::thread;
use thermoguard_ipc::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn tagged(name: &str) -> Message {
    Message::self_test(Member::Main, Member::Main, SelfTestEvent::ReqFromMainToMain)
        .with_entry("name", name)
}

fn name_of(msg: &Message) -> Option<&str> {
    msg.get("name").and_then(serde_json::Value::as_str)
}

mod channel_scenarios {
    use super::*;

    /// Scenario: capacity 2 channel rejects the third put until one get
    #[test]
    fn scenario_bounded_channel_recovers_after_get() -> TestResult {
        let channel = Channel::new("scenario", Member::Main, 2)?;

        channel.put(tagged("A"))?;
        channel.put(tagged("B"))?;

        let rejected = channel.put(tagged("C")).err().ok_or("third put must fail")?;
        assert_eq!(rejected.kind(), PutErrorKind::Full);
        assert_eq!(name_of(rejected.message()), Some("C"));

        let first = channel.get()?.ok_or("channel holds A")?;
        assert_eq!(name_of(&first), Some("A"));

        channel.put(tagged("C"))?;
        let rest: Vec<String> = std::iter::from_fn(|| channel.get().ok().flatten())
            .filter_map(|m| name_of(&m).map(str::to_owned))
            .collect();
        assert_eq!(rest, ["B", "C"]);
        Ok(())
    }

    /// Scenario: empty channel returns nothing without blocking
    #[test]
    fn scenario_empty_get_returns_none() -> TestResult {
        let channel = Channel::for_member(Member::Ir)?;
        assert!(channel.get()?.is_none());
        assert_eq!(channel.capacity(), 128);
        Ok(())
    }

    /// Scenario: teardown closes then drains every channel once
    #[test]
    fn scenario_teardown_discards_pending() -> TestResult {
        let channels = SystemChannels::new(8)?;
        channels.deliver(Message::probe(Member::Server).ok_or("probe")?)?;
        channels.deliver(Message::probe(Member::Ir).ok_or("probe")?)?;
        channels.deliver(Message::probe(Member::Main).ok_or("probe")?)?;

        assert_eq!(channels.close_all(), 3);
        assert_eq!(channels.join_all(), 3);
        assert!(channels.iter().all(Channel::is_closed));
        assert!(channels.server.put(tagged("late")).is_err_and(|e| e.is_closed()));
        Ok(())
    }

    /// Scenario: producer and consumer on different threads see FIFO order
    #[test]
    fn scenario_cross_thread_fifo() -> TestResult {
        let channel = Channel::new("xthread", Member::Server, 256)?;
        let writer = channel.writer();

        let producer = thread::spawn(move || {
            for n in 0..200u64 {
                let msg = Message::self_test(Member::Main, Member::Server, SelfTestEvent::ReqFromMainToServer)
                    .with_entry("seq", n);
                if writer.put(msg).is_err() {
                    return false;
                }
            }
            true
        });
        assert!(producer.join().map_err(|e| format!("producer panicked: {e:?}"))?);

        let reader = channel.reader();
        let mut expected = 0u64;
        while let Some(msg) = reader.get()? {
            assert_eq!(msg.get("seq").and_then(serde_json::Value::as_u64), Some(expected));
            expected += 1;
        }
        assert_eq!(expected, 200);
        Ok(())
    }
}
