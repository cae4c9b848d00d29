use std::time::{Duration, Instant};

use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};

const LOGIN_PROMPTS: [&str; 5] =
    ["login:", "user-id", "user id", "name:", "enter your"];

/// Pause between the prompt and each logon step.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogonStep {
    AwaitingBanner,
    SendingUsername,
    SendingPassword,
    SendingEnter,
    Done,
}

/// One line the logon sequence wants written.
#[derive(Debug)]
pub enum LogonMessage {
    Username(String),
    Password(SecretString),
    Enter,
}

/// Sends the username, the password and a final Enter once the remote
/// side asks for a login.
#[derive(Debug)]
pub struct AutoLogon {
    step: LogonStep,
    username: String,
    password: Option<SecretString>,
    step_delay: Duration,
    deadline: Option<Instant>,
}

impl AutoLogon {
    pub fn new(
        username: impl Into<String>,
        password: Option<SecretString>,
    ) -> Self {
        Self {
            step: LogonStep::AwaitingBanner,
            username: username.into(),
            password,
            step_delay: DEFAULT_STEP_DELAY,
            deadline: None,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn step(&self) -> LogonStep {
        self.step
    }

    /// Look for a login prompt in a clean line.
    pub fn observe(&mut self, clean: &str, now: Instant) {
        if self.step != LogonStep::AwaitingBanner {
            return;
        }

        let lower = clean.to_lowercase();
        if LOGIN_PROMPTS.iter().any(|prompt| lower.contains(prompt)) {
            debug!("[logon] prompt seen: {clean:?}");
            self.advance(LogonStep::SendingUsername, now);
        }
    }

    /// Next message to send, once its delay elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<LogonMessage> {
        if self.deadline.is_none_or(|deadline| now < deadline) {
            return None;
        }

        match self.step {
            LogonStep::AwaitingBanner | LogonStep::Done => None,
            LogonStep::SendingUsername => {
                self.advance(LogonStep::SendingPassword, now);
                Some(LogonMessage::Username(self.username.clone()))
            },
            LogonStep::SendingPassword => match &self.password {
                Some(password) => {
                    let message = LogonMessage::Password(SecretString::from(
                        password.expose_secret().to_owned(),
                    ));
                    self.advance(LogonStep::SendingEnter, now);
                    Some(message)
                },
                None => {
                    self.step = LogonStep::SendingEnter;
                    self.poll(now)
                },
            },
            LogonStep::SendingEnter => {
                info!("auto-logon sent for {}", self.username);
                self.step = LogonStep::Done;
                self.deadline = None;
                Some(LogonMessage::Enter)
            },
        }
    }

    /// Stop the sequence wherever it is.
    pub fn cancel(&mut self) {
        self.step = LogonStep::Done;
        self.deadline = None;
    }

    /// Arm the sequence again for a new connection.
    pub fn restart(&mut self) {
        self.step = LogonStep::AwaitingBanner;
        self.deadline = None;
    }

    fn advance(&mut self, step: LogonStep, now: Instant) {
        self.step = step;
        self.deadline = Some(now + self.step_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    fn logon(password: Option<&str>) -> AutoLogon {
        let password = password.map(|p| SecretString::from(p.to_owned()));
        AutoLogon::new("wanda", password).with_step_delay(DELAY)
    }

    #[test]
    fn sends_each_step_after_its_delay() {
        let start = Instant::now();
        let mut logon = logon(Some("hunter2"));

        assert!(logon.poll(start + DELAY * 10).is_none());
        logon.observe("Enter your User-ID:", start);
        assert_eq!(logon.step(), LogonStep::SendingUsername);
        assert!(logon.poll(start).is_none());

        let t1 = start + DELAY;
        assert!(matches!(
            logon.poll(t1),
            Some(LogonMessage::Username(name)) if name == "wanda"
        ));
        assert!(logon.poll(t1).is_none());

        let t2 = t1 + DELAY;
        match logon.poll(t2) {
            Some(LogonMessage::Password(secret)) => {
                assert_eq!(secret.expose_secret(), "hunter2")
            },
            other => panic!("expected password, got {other:?}"),
        }

        assert!(matches!(logon.poll(t2 + DELAY), Some(LogonMessage::Enter)));
        assert_eq!(logon.step(), LogonStep::Done);
        assert!(logon.poll(t2 + DELAY * 5).is_none());
    }

    #[test]
    fn missing_password_goes_straight_to_enter() {
        let start = Instant::now();
        let mut logon = logon(None);
        logon.observe("login:", start);

        assert!(logon.poll(start + DELAY).is_some());
        assert!(matches!(
            logon.poll(start + DELAY * 2),
            Some(LogonMessage::Enter)
        ));
    }

    #[test]
    fn cancel_and_restart() {
        let start = Instant::now();
        let mut logon = logon(None);
        logon.observe("Name:", start);
        logon.cancel();
        assert!(logon.poll(start + DELAY).is_none());

        logon.observe("Name:", start);
        assert_eq!(logon.step(), LogonStep::Done);

        logon.restart();
        logon.observe("Name:", start);
        assert_eq!(logon.step(), LogonStep::SendingUsername);
    }
}
