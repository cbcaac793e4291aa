//! XObject operators.
//!
//! Handles: Do
//!
//! Images and forms are drawn inside their own `q`/`Q` pair so the placement
//! matrix does not leak into the rest of the content.

use crate::canvas::PdfCanvas;
use crate::canvas::image::{PdfFormXObject, PdfImageXObject};
use crate::canvas::resources::ResourceType;
use crate::error::Result;
use crate::model::objects::PdfObject;
use crate::utils::Matrix;

impl PdfCanvas<'_> {
    /// Draws `image` with the placement matrix `matrix`, which maps the unit
    /// square onto the page.
    ///
    /// PDF operators: `q cm Do Q`
    pub fn add_image(&mut self, image: &PdfImageXObject, matrix: Matrix) -> Result<&mut Self> {
        let name = self.add_resource(ResourceType::Image, PdfObject::Ref(image.objref()))?;
        self.placed_xobject(&name, matrix);
        Ok(self)
    }

    /// Draws `image` into the rectangle at `(x, y)` of the given size.
    pub fn add_image_with_size(
        &mut self,
        image: &PdfImageXObject,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<&mut Self> {
        self.add_image(image, (width, 0.0, 0.0, height, x, y))
    }

    /// Draws `form` with its origin moved to `(x, y)`.
    pub fn add_xobject(&mut self, form: &PdfFormXObject, x: f64, y: f64) -> Result<&mut Self> {
        self.add_xobject_with_matrix(form, (1.0, 0.0, 0.0, 1.0, x, y))
    }

    /// PDF operators: `q cm Do Q`
    pub fn add_xobject_with_matrix(&mut self, form: &PdfFormXObject, matrix: Matrix) -> Result<&mut Self> {
        let name = self.add_resource(ResourceType::Form, PdfObject::Ref(form.objref()))?;
        self.placed_xobject(&name, matrix);
        Ok(self)
    }

    fn placed_xobject(&mut self, name: &str, m: Matrix) {
        self.write_operator("q");
        self.numbers_op(&[m.0, m.1, m.2, m.3, m.4, m.5], "cm");
        self.write_name(name);
        self.write_operator("Do");
        self.write_operator("Q");
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::PdfCanvas;
    use crate::canvas::image::{ImageParams, PdfFormXObject, PdfImageXObject};
    use crate::document::PdfDocument;
    use crate::model::color::PdfColorSpace;

    #[test]
    fn test_image_and_form_names() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let params = ImageParams::new(1, 1, PdfColorSpace::device_gray());
        let image = PdfImageXObject::new(&mut doc, vec![0u8], params).unwrap();
        let form = PdfFormXObject::new(&mut doc, (0.0, 0.0, 10.0, 10.0)).unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.add_image_with_size(&image, 10.0, 20.0, 100.0, 50.0).unwrap();
        canvas.add_xobject(&form, 5.0, 5.0).unwrap();
        canvas.add_image_with_size(&image, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(
            canvas.pending(),
            b"q\n100 0 0 50 10 20 cm\n/Im1 Do\nQ\nq\n1 0 0 1 5 5 cm\n/Fm1 Do\nQ\nq\n1 0 0 1 0 0 cm\n/Im1 Do\nQ\n"
        );
    }
}
