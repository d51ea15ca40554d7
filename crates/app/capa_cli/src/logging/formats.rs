use std::io::{self, Write};

use flexi_logger::{DeferredNow, style};
use log::Record;

/// `LEVEL message`, level colored when the terminal supports it.
pub fn cli_format(w: &mut dyn Write, _now: &mut DeferredNow, record: &Record) -> io::Result<()> {
    let level = record.level();
    write!(
        w,
        "{} {}",
        style(level).paint(format!("{level:<5}")),
        record.args()
    )
}
