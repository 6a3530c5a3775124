pub use timer::Timer;

/// Name mapping for option enums, shader types and specs
/// spelled the same in `Glint.toml`, cli flags and test headers.
/// Implemented by `enum_as_str!`.
pub trait AsStr: Sized + 'static {
    const ALL: &[Self];
    fn as_str(self) -> &'static str;
    fn from_str(string: &str) -> Option<Self>;
}

mod timer {
    use std::time::Instant;

    pub struct Timer {
        start: Instant,
    }

    impl Timer {
        pub fn start() -> Timer {
            Timer { start: Instant::now() }
        }
        /// milliseconds since `start`
        pub fn measure_ms(self) -> f64 {
            self.start.elapsed().as_secs_f64() * 1000.0
        }
    }
}

pub mod os {
    use crate::error::Error;
    use crate::errors as err;
    use std::path::{Path, PathBuf};

    pub fn dir_get_current_working() -> Result<PathBuf, Error> {
        std::env::current_dir()
            .map_err(|io_error| err::os_dir_get_current_working(io_error.to_string()))
    }

    pub fn dir_read(path: &Path) -> Result<std::fs::ReadDir, Error> {
        std::fs::read_dir(path).map_err(|io_error| err::os_dir_read(io_error.to_string(), path))
    }

    pub fn dir_entry_read(
        origin: &Path,
        entry_result: Result<std::fs::DirEntry, std::io::Error>,
    ) -> Result<std::fs::DirEntry, Error> {
        entry_result.map_err(|io_error| err::os_dir_entry_read(io_error.to_string(), origin))
    }

    pub fn file_read(path: &Path) -> Result<String, Error> {
        std::fs::read_to_string(path)
            .map_err(|io_error| err::os_file_read(io_error.to_string(), path))
    }
}
