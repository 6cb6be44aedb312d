//! Target data model: how wide `long` and pointers are, and whether plain
//! `char` is signed. Derived from the compiler flags.

use hdrbind_core::descriptor::{CharKind, IntWidth, Signedness, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataModel {
    pub long_width: IntWidth,
    pub pointer_width: IntWidth,
    pub char_signedness: Signedness,
    /// `wchar_t` is a 16-bit unsigned type (Windows targets).
    pub short_wchar: bool,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::LP64
    }
}

impl DataModel {
    pub const LP64: DataModel = DataModel {
        long_width: IntWidth::W64,
        pointer_width: IntWidth::W64,
        char_signedness: Signedness::Signed,
        short_wchar: false,
    };

    pub const ILP32: DataModel = DataModel {
        long_width: IntWidth::W32,
        pointer_width: IntWidth::W32,
        char_signedness: Signedness::Signed,
        short_wchar: false,
    };

    pub const LLP64: DataModel = DataModel {
        long_width: IntWidth::W32,
        pointer_width: IntWidth::W64,
        char_signedness: Signedness::Signed,
        short_wchar: true,
    };

    /// Data model selected by `args`. Later flags override earlier ones;
    /// flags that do not affect the data model are ignored.
    pub fn from_args(args: &[String]) -> Self {
        let mut model = DataModel::default();
        let mut char_override = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-m32" => model = DataModel::ILP32,
                "-m64" => model = DataModel::LP64,
                "-funsigned-char" => char_override = Some(Signedness::Unsigned),
                "-fsigned-char" => char_override = Some(Signedness::Signed),
                "-target" => {
                    if let Some(triple) = iter.next() {
                        model = DataModel::for_triple(triple);
                    }
                }
                other => {
                    if let Some(triple) = other.strip_prefix("--target=") {
                        model = DataModel::for_triple(triple);
                    }
                }
            }
        }
        if let Some(signedness) = char_override {
            model.char_signedness = signedness;
        }
        tracing::debug!(?model, "data model");
        model
    }

    /// Data model for a target triple such as `x86_64-pc-windows-msvc`.
    pub fn for_triple(triple: &str) -> Self {
        let arch = triple.split('-').next().unwrap_or_default();
        let bits32 = matches!(arch, "i386" | "i486" | "i586" | "i686" | "x86" | "wasm32" | "riscv32")
            || (arch.starts_with("arm") && arch != "arm64")
            || arch.starts_with("thumb");
        let windows = triple.contains("windows") || triple.contains("mingw") || triple.contains("win32");
        let mut model = match (windows, bits32) {
            (_, true) => DataModel::ILP32,
            (true, false) => DataModel::LLP64,
            (false, false) => DataModel::LP64,
        };
        model.short_wchar = windows;
        let apple = triple.contains("apple") || triple.contains("darwin");
        let unsigned_char_arch = arch.starts_with("arm")
            || arch.starts_with("aarch64")
            || arch.starts_with("thumb")
            || arch.starts_with("powerpc")
            || arch.starts_with("riscv")
            || arch == "s390x";
        if unsigned_char_arch && !apple && !windows {
            model.char_signedness = Signedness::Unsigned;
        }
        model
    }

    /// Type of plain `char`.
    pub fn plain_char(&self) -> TypeDescriptor {
        TypeDescriptor::Char(CharKind::Plain(self.char_signedness))
    }

    /// Typedefs every translation unit sees without including anything,
    /// standing in for the usual system headers.
    pub fn predefined_typedefs(&self) -> Vec<(&'static str, TypeDescriptor)> {
        use IntWidth::*;
        use Signedness::*;
        let int = TypeDescriptor::int;
        let wchar = if self.short_wchar {
            int(Unsigned, W16)
        } else {
            int(Signed, W32)
        };
        vec![
            ("int8_t", TypeDescriptor::Char(CharKind::Signed)),
            ("int16_t", int(Signed, W16)),
            ("int32_t", int(Signed, W32)),
            ("int64_t", int(Signed, W64)),
            ("uint8_t", TypeDescriptor::Char(CharKind::Unsigned)),
            ("uint16_t", int(Unsigned, W16)),
            ("uint32_t", int(Unsigned, W32)),
            ("uint64_t", int(Unsigned, W64)),
            ("size_t", int(Unsigned, self.pointer_width)),
            ("ssize_t", int(Signed, self.pointer_width)),
            ("ptrdiff_t", int(Signed, self.pointer_width)),
            ("intptr_t", int(Signed, self.pointer_width)),
            ("uintptr_t", int(Unsigned, self.pointer_width)),
            ("intmax_t", int(Signed, W64)),
            ("uintmax_t", int(Unsigned, W64)),
            ("wchar_t", wchar),
            ("char16_t", int(Unsigned, W16)),
            ("char32_t", int(Unsigned, W32)),
            ("FILE", TypeDescriptor::Record { spelling: "FILE".into() }),
            ("va_list", TypeDescriptor::Record { spelling: "va_list".into() }),
            ("__builtin_va_list", TypeDescriptor::Record { spelling: "va_list".into() }),
        ]
    }
}
