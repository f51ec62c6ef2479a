/// A source location.
#[derive(Debug, Default, Clone)]
pub struct Source<'a> {
    pub(crate) directory: Option<&'a str>,
    pub(crate) file: Option<&'a str>,
    pub(crate) line: u64,
    pub(crate) column: u64,
}

impl<'a> Source<'a> {
    /// The directory.
    ///
    /// This may be absolute, or relative to the compilation directory of the unit.
    #[inline]
    pub fn directory(&self) -> Option<&'a str> {
        self.directory
    }

    /// The file name.
    #[inline]
    pub fn file(&self) -> Option<&'a str> {
        self.file
    }

    /// Return true if there is no file name.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.file.is_none()
    }

    /// The complete file path.
    pub fn path(&self, comp_dir: Option<&str>) -> Option<String> {
        fn is_absolute(directory: &str) -> bool {
            directory.get(0..1) == Some("/") || directory.get(1..2) == Some(":")
        }

        self.file().map(|file| {
            if is_absolute(file) {
                return file.to_string();
            }
            let mut path = String::new();
            match self.directory() {
                Some(directory) => {
                    if let (false, Some(comp_dir)) = (is_absolute(directory), comp_dir) {
                        path.push_str(comp_dir);
                        path.push('/');
                    }
                    path.push_str(directory);
                    path.push('/');
                }
                None => {
                    if let Some(comp_dir) = comp_dir {
                        path.push_str(comp_dir);
                        path.push('/');
                    }
                }
            }
            path.push_str(file);
            path
        })
    }

    /// The source line number.
    ///
    /// 0 means unknown line number.
    #[inline]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The source column number.
    ///
    /// 0 means unknown column number.
    #[inline]
    pub fn column(&self) -> u64 {
        self.column
    }
}
