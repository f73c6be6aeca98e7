use std::collections::HashMap;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, Duration, Instant};
use tracing::warn;

use bridge_core::MessageId;

use crate::error::{Result, SendError};
use crate::hasher::{message_fingerprint, MessageFingerprint};

/// Default lifetime of a recorded send
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration for the send recorder
#[derive(Debug, Clone)]
pub struct SendRecorderConfig {
    /// How long a completed send is remembered
    pub entry_ttl: Duration,
}

impl SendRecorderConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self {
            entry_ttl: DEFAULT_ENTRY_TTL,
        }
    }

    /// Set the entry lifetime
    pub fn with_entry_ttl(mut self, entry_ttl: Duration) -> Self {
        self.entry_ttl = entry_ttl;
        self
    }
}

impl Default for SendRecorderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The record of one in-flight or recently completed send.
///
/// `done` is signalled exactly once: on success after the upstream
/// identifier has been stored, or on failure just before the entry is
/// removed. An entry evicted without ever being settled leaves its waiters
/// parked until their own deadlines.
struct SendEntry {
    message_id: Option<MessageId>,
    expires_at: Instant,
    done: watch::Sender<bool>,
}

impl SendEntry {
    fn new(expires_at: Instant) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            message_id: None,
            expires_at,
            done,
        }
    }

    fn signal(&self) {
        self.done.send_replace(true);
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

enum WaitOutcome {
    Sent(MessageId),
    Failed,
}

/// Records outgoing sends by content fingerprint so that retried or
/// duplicated submissions are transmitted at most once.
///
/// The caller that wins [`try_insert_wait`](SendRecorder::try_insert_wait)
/// owns the send and must settle it with exactly one of
/// [`add_message_id`](SendRecorder::add_message_id) or
/// [`remove_on_fail`](SendRecorder::remove_on_fail). Everyone else waits for
/// that outcome. All operations are safe to call concurrently.
pub struct SendRecorder {
    config: SendRecorderConfig,
    entries: Mutex<HashMap<MessageFingerprint, SendEntry>>,
}

impl SendRecorder {
    /// Create a new recorder with the given configuration
    pub fn new(config: SendRecorderConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Try to record the given message literal as an in-flight send.
    ///
    /// Returns the fingerprint and `true` when the caller won the insert; it
    /// must proceed to send and settle the entry. When a live entry already
    /// exists, waits for its outcome: a successful previous send returns
    /// `false` (the caller must suppress its own send), a failed one frees
    /// the slot and the caller competes to become the new owner. The wait is
    /// bounded by `deadline`.
    pub async fn try_insert_wait(
        &self,
        literal: &[u8],
        deadline: Instant,
    ) -> Result<(MessageFingerprint, bool)> {
        let fingerprint = message_fingerprint(literal)?;

        loop {
            if self.try_insert(&fingerprint).await {
                return Ok((fingerprint, true));
            }

            // A message with this fingerprint is already being sent; wait for it.
            match self.wait(&fingerprint, deadline).await? {
                WaitOutcome::Sent(_) => return Ok((fingerprint, false)),
                // The previous attempt failed; compete for the freed slot.
                WaitOutcome::Failed => continue,
            }
        }
    }

    /// Look up whether this literal has already been recorded.
    ///
    /// When a live entry exists, waits until its upstream identifier is
    /// known and returns it. A missing entry answers `None` immediately, and
    /// so does an elapsed deadline; the query is answered in the negative
    /// rather than failing.
    pub async fn has_entry_wait(
        &self,
        literal: &[u8],
        deadline: Instant,
    ) -> Result<Option<MessageId>> {
        let fingerprint = message_fingerprint(literal)?;

        loop {
            if !self.has_entry(&fingerprint).await {
                return Ok(None);
            }

            match self.wait(&fingerprint, deadline).await {
                Ok(WaitOutcome::Sent(message_id)) => return Ok(Some(message_id)),
                // The attempt in flight failed; see what the next one does.
                Ok(WaitOutcome::Failed) => continue,
                Err(SendError::WaitTimeout) => return Ok(None),
                Err(error) => return Err(error),
            }
        }
    }

    /// Record the identifier the upstream assigned to a completed send and
    /// wake all waiters.
    pub async fn add_message_id(&self, fingerprint: &MessageFingerprint, message_id: MessageId) {
        let mut entries = self.entries.lock().await;

        match entries.get_mut(fingerprint) {
            Some(entry) => {
                entry.message_id = Some(message_id);
                entry.signal();
            }
            None => {
                warn!(%fingerprint, "cannot record message id, the send entry may have expired");
            }
        }
    }

    /// Forget a send that failed, unless it has already succeeded.
    ///
    /// Waiters are woken and will find the slot free. A failure signalled
    /// after the entry already carries an identifier is spurious and ignored.
    pub async fn remove_on_fail(&self, fingerprint: &MessageFingerprint) {
        let mut entries = self.entries.lock().await;

        let Some(entry) = entries.get(fingerprint) else {
            return;
        };
        if entry.message_id.is_some() {
            return;
        }

        entry.signal();
        entries.remove(fingerprint);
    }

    async fn try_insert(&self, fingerprint: &MessageFingerprint) -> bool {
        let mut entries = self.entries.lock().await;
        evict_expired(&mut entries);

        if entries.contains_key(fingerprint) {
            return false;
        }

        entries.insert(
            fingerprint.clone(),
            SendEntry::new(Instant::now() + self.config.entry_ttl),
        );

        true
    }

    async fn has_entry(&self, fingerprint: &MessageFingerprint) -> bool {
        let mut entries = self.entries.lock().await;
        evict_expired(&mut entries);

        entries.contains_key(fingerprint)
    }

    // Suspends on the entry's completion signal without holding the entries
    // lock, then re-reads the outcome under the lock.
    async fn wait(&self, fingerprint: &MessageFingerprint, deadline: Instant) -> Result<WaitOutcome> {
        let mut done = {
            let entries = self.entries.lock().await;
            match entries.get(fingerprint) {
                Some(entry) => entry.done.subscribe(),
                // Gone between the failed insert and now; the caller re-checks.
                None => return Ok(WaitOutcome::Failed),
            }
        };

        let settled = time::timeout_at(deadline, done.wait_for(|signalled| *signalled))
            .await
            .map(|r| r.is_ok());
        match settled {
            Ok(true) => {}
            // The entry was evicted without ever being settled. Only the
            // waiter's own deadline releases it; the owner was supposed to
            // settle, and future operations reclaim the abandoned slot.
            Ok(false) => {
                time::sleep_until(deadline).await;
                return Err(SendError::WaitTimeout);
            }
            Err(_) => return Err(SendError::WaitTimeout),
        }

        let entries = self.entries.lock().await;
        match entries
            .get(fingerprint)
            .and_then(|entry| entry.message_id.clone())
        {
            Some(message_id) => Ok(WaitOutcome::Sent(message_id)),
            None => Ok(WaitOutcome::Failed),
        }
    }
}

fn evict_expired(entries: &mut HashMap<MessageFingerprint, SendEntry>) {
    let now = Instant::now();
    entries.retain(|_, entry| !entry.is_expired(now));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use std::sync::Arc;

    const LITERAL_1: &[u8] = b"From: Sender <sender@example.com>\r\n\
To: Receiver <receiver@example.com>\r\n\
Content-Type: multipart/mixed; boundary=longrandomstring\r\n\
\r\n\
--longrandomstring\r\n\
\r\n\
body\r\n\
--longrandomstring\r\n\
Content-Disposition: attachment; filename=\"attname.txt\"\r\n\
\r\n\
attachment\r\n\
--longrandomstring--\r\n";

    const LITERAL_2: &[u8] = b"From: Sender <sender@example.com>\r\n\
To: Receiver <receiver@example.com>\r\n\
Content-Type: multipart/mixed; boundary=longrandomstring\r\n\
\r\n\
--longrandomstring\r\n\
\r\n\
body\r\n\
--longrandomstring\r\n\
Content-Disposition: attachment; filename=\"attname2.txt\"\r\n\
\r\n\
attachment\r\n\
--longrandomstring--\r\n";

    fn recorder() -> SendRecorder {
        SendRecorder::new(SendRecorderConfig::default())
    }

    fn deadline_in(duration: Duration) -> Instant {
        Instant::now() + duration
    }

    #[tokio::test]
    async fn test_insert() {
        let recorder = recorder();

        let (fingerprint_1, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // Simulate successfully sending the message.
        recorder
            .add_message_id(&fingerprint_1, MessageId::new("abc"))
            .await;

        // Inserting a message with the same fingerprint should return false.
        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(!inserted);

        // Inserting a message with a different fingerprint should return true.
        let (fingerprint_2, inserted) = recorder
            .try_insert_wait(LITERAL_2, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);
        assert_ne!(fingerprint_1, fingerprint_2);
    }

    #[tokio::test]
    async fn test_insert_expired() {
        let recorder = SendRecorder::new(
            SendRecorderConfig::default().with_entry_ttl(Duration::from_secs(1)),
        );

        let (fingerprint_1, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        recorder
            .add_message_id(&fingerprint_1, MessageId::new("abc"))
            .await;

        // Wait for the entry to expire.
        time::sleep(Duration::from_secs(1)).await;

        // The previous entry has expired, so the insert succeeds again and
        // produces the same fingerprint.
        let (fingerprint_2, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);
        assert_eq!(fingerprint_1, fingerprint_2);
    }

    #[tokio::test]
    async fn test_wait_send_success() {
        let recorder = Arc::new(recorder());

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // Simulate successfully sending the message after half a second.
        let owner = Arc::clone(&recorder);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            owner.add_message_id(&fingerprint, MessageId::new("abc")).await;
        });

        // The duplicate sees the success and must suppress its own send.
        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(!inserted);
    }

    #[tokio::test]
    async fn test_wait_send_fail() {
        let recorder = Arc::new(recorder());

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // Simulate failing to send the message after half a second.
        let owner = Arc::clone(&recorder);
        let failed = fingerprint.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            owner.remove_on_fail(&failed).await;
        });

        // The duplicate becomes the new owner of the same fingerprint.
        let (fingerprint_2, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);
        assert_eq!(fingerprint, fingerprint_2);
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let recorder = recorder();

        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // The owner never settles the entry, so the duplicate times out.
        let result = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await;
        assert!(matches!(result, Err(SendError::WaitTimeout)));
    }

    #[tokio::test]
    async fn test_has_entry() {
        let recorder = recorder();

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        recorder
            .add_message_id(&fingerprint, MessageId::new("abc"))
            .await;

        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, Some(MessageId::new("abc")));
    }

    #[tokio::test]
    async fn test_has_entry_send_success() {
        let recorder = Arc::new(recorder());

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        let owner = Arc::clone(&recorder);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            owner.add_message_id(&fingerprint, MessageId::new("abc")).await;
        });

        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, Some(MessageId::new("abc")));
    }

    #[tokio::test]
    async fn test_has_entry_send_fail() {
        let recorder = Arc::new(recorder());

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        let owner = Arc::clone(&recorder);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            owner.remove_on_fail(&fingerprint).await;
        });

        // The send failed, so the lookup comes back empty.
        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_has_entry_timeout() {
        let recorder = recorder();

        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // The entry never settles; the deadline answers in the negative
        // rather than failing.
        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_has_entry_expired() {
        let recorder = SendRecorder::new(
            SendRecorderConfig::default().with_entry_ttl(Duration::from_secs(1)),
        );

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        recorder
            .add_message_id(&fingerprint, MessageId::new("abc"))
            .await;

        time::sleep(Duration::from_secs(1)).await;

        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_add_message_id_after_eviction_is_ignored() {
        let recorder = SendRecorder::new(
            SendRecorderConfig::default().with_entry_ttl(Duration::from_millis(50)),
        );

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        time::sleep(Duration::from_millis(100)).await;

        // Force the eviction scan, then deliver the late identifier.
        assert!(!recorder.has_entry(&fingerprint).await);
        recorder
            .add_message_id(&fingerprint, MessageId::new("late"))
            .await;

        // The slot is free again.
        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);
    }

    #[tokio::test]
    async fn test_remove_on_fail_after_success_is_ignored() {
        let recorder = recorder();

        let (fingerprint, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        recorder
            .add_message_id(&fingerprint, MessageId::new("abc"))
            .await;

        // A late failure signal after success is spurious.
        recorder.remove_on_fail(&fingerprint).await;

        let found = recorder
            .has_entry_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(found, Some(MessageId::new("abc")));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_single_winner() {
        let recorder = Arc::new(recorder());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let recorder = Arc::clone(&recorder);
            handles.push(tokio::spawn(async move {
                recorder
                    .try_insert_wait(LITERAL_1, deadline_in(Duration::from_millis(200)))
                    .await
            }));
        }

        let mut winners = 0;
        let mut timeouts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok((_, true)) => winners += 1,
                Ok((_, false)) => {}
                Err(SendError::WaitTimeout) => timeouts += 1,
                Err(error) => panic!("unexpected error: {error}"),
            }
        }

        // Exactly one task wins the insert; the rest wait until their
        // deadline because the winner never settles the entry.
        assert_eq!(winners, 1);
        assert_eq!(timeouts, 7);
    }

    #[tokio::test]
    async fn test_waiter_on_evicted_entry_blocks_until_deadline() {
        let recorder = Arc::new(SendRecorder::new(
            SendRecorderConfig::default().with_entry_ttl(Duration::from_millis(200)),
        ));

        let (_, inserted) = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(inserted);

        // An unrelated operation evicts the abandoned entry once it expires.
        let scanner = Arc::clone(&recorder);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(300)).await;
            let _ = scanner
                .try_insert_wait(LITERAL_2, deadline_in(Duration::from_millis(10)))
                .await;
        });

        // The waiter does not observe the eviction; it stays blocked until
        // its own deadline and then times out.
        let started = Instant::now();
        let result = recorder
            .try_insert_wait(LITERAL_1, deadline_in(Duration::from_millis(800)))
            .await;

        assert!(matches!(result, Err(SendError::WaitTimeout)));
        assert!(started.elapsed() >= Duration::from_millis(700));
    }
}
