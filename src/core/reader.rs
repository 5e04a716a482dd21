use crate::core::error::ScanError;
use crate::core::service::{CardService, ReaderName};

/// A reader list no longer than this holds only the terminating nulls
pub const MIN_READER_LIST_LEN: usize = 2;

/// List the readers known to the card service, in enumeration order.
///
/// A too-short list is reported as [`ScanError::NoReaders`] without querying
/// the names themselves.
pub fn list_readers<S: CardService>(service: &S) -> Result<Vec<ReaderName>, ScanError> {
    let len = service.reader_list_len()?;
    if len <= MIN_READER_LIST_LEN {
        return Err(ScanError::NoReaders);
    }

    let mut readers_buf = vec![0; len];
    service.read_reader_list(&mut readers_buf)?;

    let readers = split_multi_string(&readers_buf);
    if readers.is_empty() {
        return Err(ScanError::NoReaders);
    }

    log::debug!("Found {} reader(s)", readers.len());
    Ok(readers)
}

/// Split a null-separated, double-null-terminated name list.
///
/// Parsing stops at the first empty entry or at the end of the buffer.
pub fn split_multi_string(buf: &[u8]) -> Vec<ReaderName> {
    buf.split(|&b| b == 0)
        .take_while(|entry| !entry.is_empty())
        .map(|entry| ReaderName::new(String::from_utf8_lossy(entry)))
        .collect()
}

/// Pick the reader to scan: the first one whose name contains any of the
/// `preferred` fragments, otherwise the first reader.
pub fn choose_reader<S: AsRef<str>>(readers: &[ReaderName], preferred: &[S]) -> usize {
    readers
        .iter()
        .position(|reader| {
            preferred
                .iter()
                .any(|fragment| reader.as_str().contains(fragment.as_ref()))
        })
        .unwrap_or(0)
}
