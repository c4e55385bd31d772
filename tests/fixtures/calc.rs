//! Integer helpers

pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

pub fn first(a: u8, _: u8) -> u8 {
    a
}

fn checked_div(num: i32, den: i32) -> Option<i32> {
    if den == 0 {
        return None;
    }
    Some(num / den)
}
