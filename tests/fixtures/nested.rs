pub mod outer {
    pub fn middle(x: u32) -> u32 {
        inner::deep(x) + 1
    }

    pub mod inner {
        pub fn deep(x: u32) -> u32 {
            x * 2
        }
    }
}

pub fn top() -> u32 {
    outer::middle(1)
}
