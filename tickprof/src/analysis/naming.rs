//! Human-readable frame names for reports

use tickprof_common::{StackFrame, BCI_NATIVE_FRAME, BCI_RUNTIME_STUB, BCI_UNRESOLVED_ADDRESS};

use crate::domain::{MethodId, MethodInfo};
use crate::host::MethodResolver;
use crate::jit::JitIndex;
use crate::symbolization::{demangle_symbol, SymbolTable};

/// How managed class names are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// `java/lang/Thread.run`, used by flame graphs
    Slashed,
    /// `java.lang.Thread.run`, used by the top-N reports
    Dotted,
}

pub struct FrameNamer<'a> {
    methods: &'a dyn MethodResolver,
    symbols: &'a SymbolTable,
    jit: &'a JitIndex,
}

impl<'a> FrameNamer<'a> {
    pub fn new(methods: &'a dyn MethodResolver, symbols: &'a SymbolTable, jit: &'a JitIndex) -> Self {
        Self { methods, symbols, jit }
    }

    #[must_use]
    pub fn name(&self, frame: &StackFrame, style: NameStyle) -> String {
        if frame.method_id == 0 {
            return "[unknown]".to_string();
        }
        #[allow(clippy::cast_possible_truncation)]
        let address = frame.method_id as usize;

        match frame.bci {
            BCI_NATIVE_FRAME => self
                .symbols
                .name_of(address)
                .map_or_else(|| format!("0x{address:x}"), demangle_symbol),
            BCI_UNRESOLVED_ADDRESS => format!("0x{address:x}"),
            BCI_RUNTIME_STUB => self.jit.stub_name(address).unwrap_or_else(|| format!("0x{address:x}")),
            _ => match self.methods.describe(MethodId(frame.method_id)) {
                Ok(info) => method_name(&info, style),
                Err(code) => format!("[jvmtiError {code}]"),
            },
        }
    }
}

/// `Class.method` from a VM class signature like `Ljava/lang/Thread;`
fn method_name(info: &MethodInfo, style: NameStyle) -> String {
    let signature = info.class_signature.as_str();
    let class = signature.strip_prefix('L').unwrap_or(signature);
    let class = class.strip_suffix(';').unwrap_or(class);
    match style {
        NameStyle::Slashed => format!("{class}.{}", info.name),
        NameStyle::Dotted => format!("{}.{}", class.replace('/', "."), info.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::{CodeCache, NativeSymbol};

    struct Methods;

    impl MethodResolver for Methods {
        fn describe(&self, method: MethodId) -> Result<MethodInfo, i32> {
            match method.0 {
                1 => Ok(MethodInfo::new("Ljava/lang/Thread;", "run")),
                2 => Ok(MethodInfo::new("[I", "clone")),
                _ => Err(23),
            }
        }
    }

    fn symbols() -> SymbolTable {
        SymbolTable::new(vec![CodeCache::new(
            "libc.so.6",
            0x1000,
            0x2000,
            vec![NativeSymbol::new(0x1100, 0x80, "write")],
        )])
    }

    #[test]
    fn test_managed_names() {
        let symbols = symbols();
        let jit = JitIndex::new();
        let namer = FrameNamer::new(&Methods, &symbols, &jit);

        assert_eq!(namer.name(&StackFrame::java(1, 3), NameStyle::Slashed), "java/lang/Thread.run");
        assert_eq!(namer.name(&StackFrame::java(1, 3), NameStyle::Dotted), "java.lang.Thread.run");
        assert_eq!(namer.name(&StackFrame::java(2, 0), NameStyle::Dotted), "[I.clone");
        assert_eq!(namer.name(&StackFrame::java(9, 0), NameStyle::Dotted), "[jvmtiError 23]");
        assert_eq!(namer.name(&StackFrame::java(0, 0), NameStyle::Dotted), "[unknown]");
    }

    #[test]
    fn test_native_names() {
        let symbols = symbols();
        let jit = JitIndex::new();
        jit.on_stub_generated(0x9000, 0x40, "call_stub");
        let namer = FrameNamer::new(&Methods, &symbols, &jit);

        assert_eq!(namer.name(&StackFrame::native(0x1100), NameStyle::Slashed), "write");
        assert_eq!(namer.name(&StackFrame::unresolved(0x7777), NameStyle::Slashed), "0x7777");
        assert_eq!(namer.name(&StackFrame::stub(0x9000), NameStyle::Slashed), "call_stub");
        assert_eq!(namer.name(&StackFrame::native(0), NameStyle::Slashed), "[unknown]");
    }
}
