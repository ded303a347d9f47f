//! The general purpose register file and program counter.

use core::fmt;
use std::fmt::Formatter;

use log::info;

/// The type of a single `x` register.
pub type X = u32;

/// The bit width of the `x` registers.
pub const XLEN: u32 = X::BITS;

/// The number of `x` registers available (indices start at `0` for `x0`).
pub const LEN: u8 = 32;

/// A hart's general purpose registers and program counter.
///
/// There are 32 `x` word-size (32 bit) registers, named `x0` up to `x31`. Register `x0` (a.k.a.
/// `zero`) is always zero; writes to it are silently discarded. There is also the `pc` register,
/// which holds the address of the instruction currently being executed.
///
/// It is not possible to get a mutable reference to an `x` register directly, since that would
/// allow unchecked writes to register `x0`; all writes go through [`Registers::set_x`] or
/// [`Registers::replace_x`], which enforce the invariant at the call site.
#[derive(Debug, Clone)]
pub struct Registers {
    x_registers: [X; LEN as usize],
    pc: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Registers {
    /// Returns a fresh register file with all `x` registers zeroed and `pc` set to `initial_pc`.
    pub fn new(initial_pc: u32) -> Self {
        Self {
            x_registers: [0; LEN as usize],
            pc: initial_pc,
        }
    }

    /// Returns the value of an `x` register. Reading `x0` always yields `0`.
    pub fn x(&self, specifier: Specifier) -> u32 {
        self.x_registers[usize::from(specifier)]
    }

    /// Sets the value of an `x` register. Writes to register `x0` are ignored.
    pub fn set_x(&mut self, specifier: Specifier, value: u32) {
        self.replace_x(specifier, value);
    }

    /// Replaces the value of an `x` register, returning its old value. Writes to register `x0`
    /// are ignored (and its old value, always `0`, is returned).
    pub fn replace_x(&mut self, specifier: Specifier, value: u32) -> u32 {
        if specifier.0 == 0 {
            0
        } else {
            std::mem::replace(&mut self.x_registers[specifier.0 as usize], value)
        }
    }

    /// Returns the value of the `pc` register.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Sets the `pc` register directly. Callers are responsible for any alignment policy; this
    /// does not mask or validate `value`.
    pub fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Returns a mutable reference to the `pc` register value.
    pub fn pc_mut(&mut self) -> &mut u32 {
        &mut self.pc
    }

    /// Advances `pc` by the size of one instruction (4 bytes), wrapping on overflow.
    pub fn inc_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Logs the non-zero `x` registers and the program counter at `info` level, and returns the
    /// same information as a displayable summary. Never mutates state.
    pub fn dump(&self) -> RegisterDump {
        let dump = RegisterDump {
            pc: self.pc,
            non_zero: Specifier::iter_all()
                .filter(|&s| s != Specifier::X0)
                .map(|s| (s, self.x(s)))
                .filter(|&(_, value)| value != 0)
                .collect(),
        };
        info!("register dump: {dump}");
        dump
    }
}

/// Side-effect-free snapshot produced by [`Registers::dump`].
#[derive(Debug, Clone)]
pub struct RegisterDump {
    pub pc: u32,
    pub non_zero: Vec<(Specifier, u32)>,
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "pc={:#010x}", self.pc)?;
        for (specifier, value) in &self.non_zero {
            write!(f, ", {specifier}={value:#010x}")?;
        }
        Ok(())
    }
}

/// An `x` register specifier. Can take values in the range `0..LEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Specifier(u8);

impl Specifier {
    /// Register `x0`, a.k.a. register `zero`, always returns `0` on read, and ignores any writes.
    pub const X0: Self = Specifier(0);

    /// Create a register specifier from its index, returning `None` if `index > 31`.
    pub fn new<U: TryInto<u8>>(index: U) -> Option<Self> {
        let index = index.try_into().ok()?;
        (index < 32).then_some(Self(index))
    }

    /// Convert a 5-bit value into a register specifier. Panics if the value doesn't fit in 5 bits
    /// (`0..=31`).
    pub fn from_u5(value_u5: u8) -> Self {
        const_assert_eq!(LEN, 32);
        if value_u5 > 31 {
            panic!("out of range u5 used");
        }
        Self(value_u5)
    }

    /// Returns an iterator over all register specifiers, starting at `x0` up to `x31`.
    pub fn iter_all() -> impl Iterator<Item = Self> {
        (0..32).map(Self)
    }
}

impl From<Specifier> for u8 {
    fn from(value: Specifier) -> Self {
        value.0
    }
}

impl From<Specifier> for u32 {
    fn from(value: Specifier) -> Self {
        value.0 as u32
    }
}

impl From<Specifier> for usize {
    fn from(value: Specifier) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}
