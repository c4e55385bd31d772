pub const fn square(x: u32) -> u32 {
    x * x
}

pub static TABLE: [u32; 3] = [square(1), square(2), square(3)];

pub static DOUBLE: fn(u32) -> u32 = |x: u32| { x * 2 };

pub fn lookup(i: usize) -> u32 {
    DOUBLE(TABLE[i]) + const { 7 }
}
