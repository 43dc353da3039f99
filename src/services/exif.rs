use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Raw EXIF capture time (`YYYY:MM:DD HH:MM:SS`), preferring
/// `DateTimeOriginal` over `DateTime`. `None` when the file carries no EXIF.
pub fn read_capture_time(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .find_map(|tag| exif.get_field(tag, exif::In::PRIMARY))
        .and_then(|field| match &field.value {
            exif::Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
}
