//! Fixed table mapping logical backend operations to script filenames.

/// The six operations the match backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Connect,
    CheckConnection,
    SendEvent,
    RetrieveEvent,
    SendParam,
    RetrieveParam,
}

/// Static registry of backend script filenames, resolved relative to the
/// configured host URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptRegistry;

impl ScriptRegistry {
    pub fn filename(&self, kind: ScriptKind) -> &'static str {
        match kind {
            ScriptKind::Connect => "send_local_ready.php",
            ScriptKind::CheckConnection => "retrieve_remote_ready.php",
            ScriptKind::SendEvent => "send_local_event.php",
            ScriptKind::RetrieveEvent => "retrieve_remote_event.php",
            ScriptKind::SendParam => "write_param.php",
            ScriptKind::RetrieveParam => "read_param.php",
        }
    }
}
