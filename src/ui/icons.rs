pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const SCHOOL: &str = "🏫";
    pub const IMAGE: &str = "🖼️";
    pub const SEARCH: &str = "🔍";
    pub const MIGRATE: &str = "⬆️";
    pub const CLOCK: &str = "⏱️";
}
