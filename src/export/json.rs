use std::io::Write;

use crate::error::ExportError;

/// Pretty-print any serializable value
pub fn write_json<T, W>(data: &T, mut writer: W) -> Result<(), ExportError>
where
    T: serde::Serialize + ?Sized,
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, data)?;
    writeln!(writer).map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}
