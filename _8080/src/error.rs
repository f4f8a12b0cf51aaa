use thiserror::Error;

/// Host or decoder failures that end a run. None of these are recoverable at the instruction level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("attempt to write {value:#04X} in ROM at {address:#06X}")]
    ReadOnly { address: u16, value: u8 },
    #[error("attempt to write {value:#04X} outside of RAM at {address:#06X}")]
    OutOfRange { address: u16, value: u8 },
    #[error("illegal instruction {opcode:#04X} at {pc:#06X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    #[error("unknown IN port {0:#04X}")]
    UnknownInputPort(u8),
    #[error("unknown OUT port {0:#04X}")]
    UnknownOutputPort(u8),
    #[error("{0:#04X} is not a restart vector")]
    InvalidVector(u8),
}

/// Deliberate terminations. A halt is how a program (or a host on its behalf) says it is done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Halt {
    #[error("CPU halted: HLT")]
    Instruction,
    #[error("CPU halted: {0}")]
    Passed(String),
    #[error("diagnostic failed: {0}")]
    Failed(String),
    #[error("CPU halted: returned to CP/M")]
    WarmBoot,
}

impl Halt {
    /// True when the halt reports a completed diagnostic rather than a failure or a bare HLT.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed(_) | Self::WarmBoot)
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Instruction => "HLT",
            Self::Passed(reason) | Self::Failed(reason) => reason,
            Self::WarmBoot => "warm boot",
        }
    }
}

/// Everything that can stop the decode-execute loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Stop {
    #[error(transparent)]
    Halt(#[from] Halt),
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl Stop {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Halt(halt) if halt.is_success())
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Halt(_) => None,
        }
    }
}
