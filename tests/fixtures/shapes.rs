use std::fmt;

pub trait Shape {
    fn area(&self) -> f64;

    fn describe(&self) -> String {
        format!("shape with area {}", self.area())
    }
}

pub struct Square {
    side: f64,
}

impl Square {
    pub fn new(side: f64) -> Self {
        Square { side }
    }

    fn scale(&mut self, factor: f64) {
        self.side *= factor;
    }
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self.side)
    }
}

pub fn total_area(shapes: &[Box<dyn Shape>]) -> f64 {
    shapes.iter().map(|s| s.area()).sum()
}

pub fn largest(sides: Vec<f64>) -> Option<f64> {
    let pick = |a: f64, b: f64| {
        if a > b { a } else { b }
    };
    sides.into_iter().reduce(pick)
}
