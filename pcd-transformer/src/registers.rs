use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

pub const REGISTER_COUNT: usize = 16;

/// Scratch values shared by every operation of one chain.
///
/// A value written by one operation is visible to the operations after it on the same
/// point and to every later point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Registers([f64; REGISTER_COUNT]);

impl Registers {
    pub fn clear(&mut self) {
        self.0 = [0.0; REGISTER_COUNT];
    }
}

impl Index<Register> for Registers {
    type Output = f64;

    fn index(&self, register: Register) -> &f64 {
        &self.0[register.0]
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, register: Register) -> &mut f64 {
        &mut self.0[register.0]
    }
}

/// Index of one register, always below [`REGISTER_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(usize);

impl Register {
    pub fn new(index: usize) -> Option<Self> {
        (index < REGISTER_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl FromStr for Register {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let index: usize = s.parse().map_err(|e| format!("{e}"))?;
        Self::new(index).ok_or_else(|| format!("register must be below {REGISTER_COUNT}"))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
