pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, section, success, timing, warn};
pub use progress::{ImportProgress, Spinner};
pub use table::{matches_table, migrations_table, stats_table};
pub use theme::{theme, Theme};
