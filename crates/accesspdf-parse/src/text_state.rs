//! Text and graphics state tracked while replaying a content stream.
//!
//! Only the parts of the PDF state model that locate text are kept: the
//! current font and size (Tf), the text and line matrices (BT, Tm, Td, TD,
//! T*), the leading (TL), and the current transformation matrix with its
//! q/Q stack.

use accesspdf_core::geometry::{Ctm, Point};

/// Text state parameters set by `Tf`, `TL` and the positioning operators.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// Font resource name from the last `Tf`.
    pub font_name: String,
    /// Declared size from the last `Tf`.
    pub font_size: f64,
    pub leading: f64,
    in_text_object: bool,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextState {
    pub fn new() -> Self {
        Self {
            font_name: String::new(),
            font_size: 0.0,
            leading: 0.0,
            in_text_object: false,
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }

    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    /// `BT`: reset both matrices to identity.
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
        self.in_text_object = true;
    }

    /// `ET`.
    pub fn end_text(&mut self) {
        self.in_text_object = false;
    }

    /// `Tf`.
    pub fn set_font(&mut self, font_name: String, font_size: f64) {
        self.font_name = font_name;
        self.font_size = font_size;
    }

    /// `Tm`: replaces (does not concatenate) both matrices.
    pub fn set_text_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let m = Ctm::new(a, b, c, d, e, f);
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: translate the line matrix and copy it to the text matrix.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Ctm::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`: `-ty TL` then `tx ty Td`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`, and the implicit line move of `'` and `"`.
    pub fn move_to_next_line(&mut self) {
        let leading = self.leading;
        self.move_text_position(0.0, -leading);
    }

    /// Rendered font size: the declared size scaled by the text matrix and
    /// the CTM.
    pub fn effective_font_size(&self, ctm: &Ctm) -> f64 {
        let combined = self.text_matrix.concat(ctm);
        (self.font_size * combined.vertical_scale()).abs()
    }

    /// Text origin in user space.
    pub fn origin(&self, ctm: &Ctm) -> Point {
        self.text_matrix.concat(ctm).origin()
    }
}

/// Graphics state: the CTM and the text parameters q/Q save and restore.
#[derive(Debug, Clone, Default)]
pub struct GraphicsState {
    pub ctm: Ctm,
    pub text: TextState,
    stack: Vec<(Ctm, String, f64, f64)>,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `q`.
    pub fn save(&mut self) {
        self.stack.push((
            self.ctm,
            self.text.font_name.clone(),
            self.text.font_size,
            self.text.leading,
        ));
    }

    /// `Q`. An unbalanced `Q` is ignored.
    pub fn restore(&mut self) {
        if let Some((ctm, font_name, font_size, leading)) = self.stack.pop() {
            self.ctm = ctm;
            self.text.font_name = font_name;
            self.text.font_size = font_size;
            self.text.leading = leading;
        }
    }

    /// `cm`: pre-multiply the CTM.
    pub fn concat_matrix(&mut self, m: Ctm) {
        self.ctm = m.concat(&self.ctm);
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
