use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::font::{encode_win_ansi, StandardFont};

/// Thin builder over PDF content stream operators.
#[derive(Debug, Default)]
pub struct Canvas {
    ops: Vec<Operation>,
}

fn num(v: f32) -> Object {
    Object::Real((v * 10_000.0).round() / 10_000.0)
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) -> &mut Self {
        self.ops.push(Operation::new(operator, operands));
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.op("q", vec![])
    }

    pub fn restore(&mut self) -> &mut Self {
        self.op("Q", vec![])
    }

    /// Concatenates `matrix` onto the current transformation matrix.
    pub fn transform(&mut self, matrix: [f32; 6]) -> &mut Self {
        self.op("cm", matrix.iter().map(|v| num(*v)).collect())
    }

    /// Applies a named `ExtGState` resource.
    pub fn graphics_state(&mut self, name: &str) -> &mut Self {
        self.op("gs", vec![Object::Name(name.as_bytes().to_vec())])
    }

    pub fn fill_gray(&mut self, g: f32) -> &mut Self {
        self.op("g", vec![num(g)])
    }

    pub fn fill_rgb(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        self.op("rg", vec![num(r), num(g), num(b)])
    }

    pub fn stroke_rgb(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        self.op("RG", vec![num(r), num(g), num(b)])
    }

    pub fn line_width(&mut self, w: f32) -> &mut Self {
        self.op("w", vec![num(w)])
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) -> &mut Self {
        self.op("re", vec![num(x), num(y), num(w), num(h)])
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op("m", vec![num(x), num(y)])
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op("l", vec![num(x), num(y)])
    }

    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) -> &mut Self {
        self.op(
            "c",
            vec![num(x1), num(y1), num(x2), num(y2), num(x), num(y)],
        )
    }

    pub fn fill(&mut self) -> &mut Self {
        self.op("f", vec![])
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.op("S", vec![])
    }

    pub fn fill_stroke(&mut self) -> &mut Self {
        self.op("B", vec![])
    }

    /// Single line of text with its baseline starting at `(x, y)`.
    pub fn text(&mut self, font: StandardFont, size: f32, x: f32, y: f32, text: &str) -> &mut Self {
        self.op("BT", vec![])
            .op(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), num(size)],
            )
            .op("Td", vec![num(x), num(y)])
            .op("Tj", vec![Object::string_literal(encode_win_ansi(text))])
            .op("ET", vec![])
    }

    /// Text centered on `center_x`.
    pub fn centered_text(
        &mut self,
        font: StandardFont,
        size: f32,
        center_x: f32,
        y: f32,
        text: &str,
    ) -> &mut Self {
        let x = center_x - font.text_width(text, size) / 2.0;
        self.text(font, size, x, y, text)
    }

    /// Text drawn with a full text matrix, for rotated output.
    pub fn text_with_matrix(
        &mut self,
        font: StandardFont,
        size: f32,
        matrix: [f32; 6],
        text: &str,
    ) -> &mut Self {
        self.op("BT", vec![])
            .op(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), num(size)],
            )
            .op("Tm", matrix.iter().map(|v| num(*v)).collect())
            .op("Tj", vec![Object::string_literal(encode_win_ansi(text))])
            .op("ET", vec![])
    }

    pub fn into_content(self) -> Content {
        Content {
            operations: self.ops,
        }
    }
}
