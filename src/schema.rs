//! Event schema catalog for OpenCL intercept traces
//!
//! Every recognized call/return pair is described by a static [`EventSchema`]:
//! the API name the call line is matched against, the ordered call and return
//! field descriptors, the kind of object the call returns (if any), and the
//! reference-count action it performs (if any).
//!
//! Registration order defines match priority: the dispatcher tries schemas in
//! the order they appear in [`REGISTRY`] and the first name match wins.

/// Category of traced OpenCL object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Context,
    CommandQueue,
    Program,
    Kernel,
    /// Generic memory object; buffers are released/retained through this kind.
    Mem,
    Buffer,
}

impl ObjectKind {
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Context => "Context",
            ObjectKind::CommandQueue => "CommandQueue",
            ObjectKind::Program => "Program",
            ObjectKind::Kernel => "Kernel",
            ObjectKind::Mem => "Mem",
            ObjectKind::Buffer => "Buffer",
        }
    }
}

/// Type tag for one call or return field; each tag owns its own line grammar
/// (see the extractors in `extract`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// `name = CL_SOME_FLAG (4)` — hex value in parentheses.
    Flags,
    /// `name = 0xdeadbeef` — resolved through the handle table. The kind is
    /// descriptive only; resolution never checks it.
    Handle(Option<ObjectKind>),
    /// `name = (nil)` or `name = 0xdeadbeef` — never resolved.
    Pointer,
    /// `name = 42`
    Int,
    /// `name = token`
    Word,
    /// Bare `name` present on the line means true; absent means unset.
    Bool,
    /// `name = <a x b x c>`
    IntVector,
    /// `name = [opaque text]` — kept verbatim, brackets included.
    NameList,
}

/// One named field in a call or return line.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub ty: ParamType,
}

const fn p(name: &'static str, ty: ParamType) -> Param {
    Param { name, ty }
}

/// Reference-count action a schema performs, naming the call parameter that
/// identifies the target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    None,
    Retain(&'static str),
    Release(&'static str),
}

const fn retainer(name: &'static str, param: &'static [Param]) -> EventSchema {
    EventSchema {
        name,
        call_params: param,
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::Retain(param[0].name),
    }
}

const fn releaser(name: &'static str, param: &'static [Param]) -> EventSchema {
    EventSchema {
        name,
        call_params: param,
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::Release(param[0].name),
    }
}

/// Static description of one recognized event kind.
#[derive(Debug, Clone, Copy)]
pub struct EventSchema {
    /// API name without the `cl` prefix, e.g. `CreateContext`. The call line
    /// is matched against `cl<name>` as an unanchored pattern.
    pub name: &'static str,
    pub call_params: &'static [Param],
    pub returns: &'static [Param],
    /// Kind of object created when the call succeeds and the return line
    /// carries a `returned 0x...` token.
    pub returned: Option<ObjectKind>,
    pub lifecycle: Lifecycle,
}

/// Schema name of the program-creation event the artifact matcher keys on.
pub const CREATE_PROGRAM_WITH_SOURCE: &str = "CreateProgramWithSource";

/// Schema name of the kernel-enqueue event buffer dumps are keyed on.
pub const ENQUEUE_NDRANGE_KERNEL: &str = "EnqueueNDRangeKernel";

/// Return field carrying the program ordinal on CreateProgramWithSource,
/// as it literally appears in the log.
pub const PROGRAM_NUMBER_FIELD: &str = "program number";

use ObjectKind::*;
use ParamType::*;

/// The full catalog, in registration order (first match wins).
pub static REGISTRY: &[EventSchema] = &[
    EventSchema {
        name: "GetPlatformIDs",
        call_params: &[],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "GetDeviceIDs",
        call_params: &[p("platform", NameList), p("device_type", Flags)],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "GetDeviceInfo",
        call_params: &[p("device", NameList), p("param_name", Flags)],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "CreateContext",
        call_params: &[
            p("properties", NameList),
            p("num_devices", Int),
            p("devices", NameList),
        ],
        returns: &[],
        returned: Some(Context),
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "CreateCommandQueue",
        call_params: &[
            p("context", Handle(Some(Context))),
            p("device", NameList),
            p("properties", Flags),
        ],
        returns: &[],
        returned: Some(CommandQueue),
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: CREATE_PROGRAM_WITH_SOURCE,
        call_params: &[p("context", Handle(Some(Context))), p("count", Int)],
        returns: &[p(PROGRAM_NUMBER_FIELD, Word)],
        returned: Some(Program),
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "BuildProgram",
        call_params: &[p("program", Handle(Some(Program))), p("pfn_notify", Pointer)],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "CreateKernel",
        call_params: &[p("program", Handle(Some(Program))), p("kernel_name", Word)],
        returns: &[],
        returned: Some(Kernel),
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "CreateBuffer",
        call_params: &[
            p("context", Handle(Some(Context))),
            p("flags", Flags),
            p("size", Int),
            p("host_ptr", Pointer),
        ],
        returns: &[],
        returned: Some(Buffer),
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "EnqueueWriteBuffer",
        call_params: &[
            p("queue", Handle(Some(CommandQueue))),
            p("buffer", Handle(Some(Buffer))),
            p("blocking", Bool),
            p("offset", Int),
            p("cb", Int),
            p("ptr", Pointer),
        ],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "EnqueueReadBuffer",
        call_params: &[
            p("queue", Handle(Some(CommandQueue))),
            p("buffer", Handle(Some(Buffer))),
            p("blocking", Bool),
            p("offset", Int),
            p("cb", Int),
            p("ptr", Pointer),
        ],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "SetKernelArg",
        call_params: &[
            p("kernel", Handle(Some(Kernel))),
            p("index", Int),
            p("size", Int),
            p("value", Handle(None)),
        ],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: ENQUEUE_NDRANGE_KERNEL,
        call_params: &[
            p("queue", Handle(Some(CommandQueue))),
            p("kernel", Handle(Some(Kernel))),
            p("global_work_offset", IntVector),
            p("global_work_size", IntVector),
            p("local_work_size", IntVector),
        ],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    EventSchema {
        name: "Finish",
        call_params: &[p("queue", Handle(Some(CommandQueue)))],
        returns: &[],
        returned: None,
        lifecycle: Lifecycle::None,
    },
    releaser("ReleaseMemObject", &[p("mem", Handle(Some(Mem)))]),
    retainer("RetainMemObject", &[p("mem", Handle(Some(Mem)))]),
    releaser("ReleaseProgram", &[p("program", Handle(Some(Program)))]),
    retainer("RetainProgram", &[p("program", Handle(Some(Program)))]),
    releaser("ReleaseKernel", &[p("kernel", Handle(Some(Kernel)))]),
    retainer("RetainKernel", &[p("kernel", Handle(Some(Kernel)))]),
    releaser(
        "ReleaseCommandQueue",
        &[p("command_queue", Handle(Some(CommandQueue)))],
    ),
    retainer(
        "RetainCommandQueue",
        &[p("command_queue", Handle(Some(CommandQueue)))],
    ),
    releaser("ReleaseContext", &[p("context", Handle(Some(Context)))]),
    retainer("RetainContext", &[p("context", Handle(Some(Context)))]),
];
