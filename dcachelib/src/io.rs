use std::fs::File;
use std::io;
use std::ops::Deref;

/// The bytes of a trace file, mapped where the platform allows it
pub enum TraceBytes {
    #[cfg(unix)]
    Mapped(memmap2::Mmap),
    Buffered(Vec<u8>),
}

impl Deref for TraceBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            TraceBytes::Mapped(m) => &m[..],
            TraceBytes::Buffered(b) => &b[..],
        }
    }
}

/// Loads a trace file for replay
///
/// Records are read strictly in order, so on unix the file is memory mapped with sequential access
/// advice. Other platforms read the whole file.
pub fn load_trace(file: File) -> io::Result<TraceBytes> {
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut file = file;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(TraceBytes::Buffered(buf))
    }
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // Mapping a zero length file fails on some platforms
        if file.metadata()?.len() == 0 {
            return Ok(TraceBytes::Buffered(Vec::new()));
        }
        // The file is only read, and is assumed not to be truncated while mapped
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(TraceBytes::Mapped(m))
    }
}
