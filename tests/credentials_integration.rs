use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use navigate_connector::credentials::{CredentialManager, MemoryStore, Prompter, SecretStore};
use navigate_connector::error::CredentialError;

/// Answers prompts from a script and records every label and notice.
#[derive(Clone, Default)]
struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<String>>>,
    transcript: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    fn new(answers: &[&str]) -> Self {
        let p = Self::default();
        p.answers.lock().unwrap().extend(answers.iter().map(|s| s.to_string()));
        p
    }

    fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }

    fn next(&self, label: &str) -> io::Result<String> {
        self.transcript.lock().unwrap().push(label.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_line(&self, label: &str) -> io::Result<String> {
        self.next(label)
    }

    fn prompt_secret(&self, label: &str) -> io::Result<String> {
        self.next(label)
    }

    fn notify(&self, message: &str) {
        self.transcript.lock().unwrap().push(message.to_string());
    }
}

/// Store shared between the manager under test and the assertions.
#[derive(Clone, Default)]
struct SharedStore(Arc<MemoryStore>);

impl SecretStore for SharedStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError> {
        self.0.get(account)
    }
    fn set(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        self.0.set(account, value)
    }
    fn delete(&self, account: &str) -> Result<(), CredentialError> {
        self.0.delete(account)
    }
}

fn manager(store: &SharedStore, prompter: &ScriptedPrompter) -> CredentialManager {
    CredentialManager::with_backends(
        "NavigateService",
        Box::new(store.clone()),
        Box::new(prompter.clone()),
    )
}

#[test]
fn load_prompts_and_stores_when_missing() {
    let store = SharedStore::default();
    let prompter = ScriptedPrompter::new(&["  jdoe \n", "key123\n"]);
    let creds = manager(&store, &prompter).load_credentials().unwrap();

    assert_eq!(creds.username, "jdoe");
    assert_eq!(creds.api_key.as_str(), "key123");
    assert_eq!(store.get("username").unwrap().as_deref(), Some("jdoe"));
    assert_eq!(store.get("api_key").unwrap().as_deref(), Some("key123"));
    assert_eq!(
        prompter.transcript(),
        vec![
            "Navigate service credentials not found.",
            "Enter Navigate username: ",
            "Enter Navigate API key: ",
            "Credentials stored successfully.",
        ]
    );
}

#[test]
fn load_uses_stored_pair_without_prompting() {
    let store = SharedStore(Arc::new(MemoryStore::with_entries([
        ("username", "stored"),
        ("api_key", "k"),
    ])));
    let prompter = ScriptedPrompter::new(&[]);
    let creds = manager(&store, &prompter).load_credentials().unwrap();
    assert_eq!(creds.username, "stored");
    assert!(prompter.transcript().is_empty());
}

#[test]
fn half_stored_pair_counts_as_missing() {
    let store = SharedStore(Arc::new(MemoryStore::with_entries([("username", "old")])));
    let prompter = ScriptedPrompter::new(&["new", "fresh-key"]);
    let m = manager(&store, &prompter);
    assert!(m.stored_credentials().unwrap().is_none());
    let creds = m.load_credentials().unwrap();
    assert_eq!(creds.username, "new");
    assert_eq!(store.get("username").unwrap().as_deref(), Some("new"));
}

#[test]
fn update_always_prompts_and_overwrites() {
    let store = SharedStore(Arc::new(MemoryStore::with_entries([
        ("username", "old"),
        ("api_key", "old-key"),
    ])));
    let prompter = ScriptedPrompter::new(&["second", "second-key"]);
    let creds = manager(&store, &prompter).update_credentials().unwrap();
    assert_eq!(creds.username, "second");
    assert_eq!(store.get("api_key").unwrap().as_deref(), Some("second-key"));
    let t = prompter.transcript();
    assert_eq!(t[0], "Enter new Navigate username: ");
    assert_eq!(t[1], "Enter new Navigate API key: ");
    assert_eq!(t[2], "Credentials updated successfully.");
}

#[test]
fn empty_input_is_rejected_and_nothing_stored() {
    let store = SharedStore::default();
    let prompter = ScriptedPrompter::new(&["jdoe", "\n"]);
    let err = manager(&store, &prompter).load_credentials().unwrap_err();
    assert!(matches!(err, CredentialError::EmptyInput(_)));
    assert!(store.get("username").unwrap().is_none());
}

#[test]
fn clear_removes_both_entries() {
    let store = SharedStore(Arc::new(MemoryStore::with_entries([
        ("username", "u"),
        ("api_key", "k"),
    ])));
    let prompter = ScriptedPrompter::new(&[]);
    let m = manager(&store, &prompter);
    m.clear_credentials().unwrap();
    m.clear_credentials().unwrap();
    assert!(m.stored_credentials().unwrap().is_none());
}
