//! Test doubles: a scripted [`MailSession`] and a capturing [`LogSink`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::rc::Rc;

use imap::types::Flag;

use crate::error::{Error, Result};
use crate::logger::LogSink;
use crate::session::{MailSession, RawMessage};

#[derive(Default)]
pub(crate) struct SessionState {
    pub selected: Option<String>,
    pub folders: Vec<String>,
    pub search_results: Vec<u32>,
    pub searches: Vec<String>,
    pub bodies: HashMap<u32, Vec<u8>>,
    pub messages: HashMap<u32, RawMessage>,
    pub appended: Vec<(String, RawMessage)>,
    pub flags_added: Vec<(u32, String)>,
    pub flags_removed: Vec<(u32, String)>,
    pub moved: Vec<(u32, String)>,
    pub created: Vec<String>,
    pub expunges: usize,
    pub logged_out: bool,

    pub fail_select: bool,
    pub fail_search: bool,
    pub fail_fetch: bool,
    pub fail_store: bool,
    pub fail_move: bool,
    pub fail_create: bool,
    pub fail_append: bool,
    pub fail_expunge: bool,
    pub fail_logout: bool,
}

/// A [`MailSession`] whose behavior is scripted through shared state, so a
/// test can both configure responses and inspect what the client did.
#[derive(Clone, Default)]
pub(crate) struct MockSession {
    pub state: Rc<RefCell<SessionState>>,
}

fn simulated() -> Error {
    Error::Io(IoError::new(ErrorKind::Other, "simulated failure"))
}

impl MailSession for MockSession {
    fn select(&mut self, folder: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_select {
            return Err(simulated());
        }
        state.selected = Some(folder.to_string());
        Ok(())
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let mut state = self.state.borrow_mut();
        if state.fail_search {
            return Err(simulated());
        }
        state.searches.push(criteria.to_string());
        Ok(state.search_results.clone())
    }

    fn fetch_body(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let state = self.state.borrow();
        if state.fail_fetch {
            return Err(simulated());
        }
        Ok(state.bodies.get(&uid).cloned())
    }

    fn fetch_message(&mut self, uid: u32) -> Result<Option<RawMessage>> {
        let state = self.state.borrow();
        if state.fail_fetch {
            return Err(simulated());
        }
        Ok(state.messages.get(&uid).cloned())
    }

    fn add_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_store {
            return Err(simulated());
        }
        for flag in flags {
            state.flags_added.push((uid, flag.to_string()));
        }
        Ok(())
    }

    fn remove_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_store {
            return Err(simulated());
        }
        for flag in flags {
            state.flags_removed.push((uid, flag.to_string()));
        }
        Ok(())
    }

    fn move_message(&mut self, uid: u32, folder: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_move {
            return Err(simulated());
        }
        state.moved.push((uid, folder.to_string()));
        Ok(())
    }

    fn list_folders(&mut self) -> Result<Vec<String>> {
        Ok(self.state.borrow().folders.clone())
    }

    fn create_folder(&mut self, folder: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(simulated());
        }
        state.created.push(folder.to_string());
        state.folders.push(folder.to_string());
        Ok(())
    }

    fn append(&mut self, folder: &str, message: &RawMessage) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_append {
            return Err(simulated());
        }
        state.appended.push((folder.to_string(), message.clone()));
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_expunge {
            return Err(simulated());
        }
        state.expunges += 1;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.logged_out = true;
        if state.fail_logout {
            return Err(simulated());
        }
        Ok(())
    }
}

/// A [`LogSink`] that accumulates output for assertions.
#[derive(Clone, Default)]
pub(crate) struct MemoryLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl MemoryLog {
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.borrow().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn debug(&self, message: &str) {
        self.entries.borrow_mut().push(format!("DEBUG {}", message));
    }

    fn info(&self, message: &str) {
        self.entries.borrow_mut().push(format!("INFO {}", message));
    }

    fn warning(&self, message: &str) {
        self.entries.borrow_mut().push(format!("WARNING {}", message));
    }

    fn error(&self, message: &str) {
        self.entries.borrow_mut().push(format!("ERROR {}", message));
    }
}
