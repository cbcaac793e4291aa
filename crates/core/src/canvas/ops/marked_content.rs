//! Marked content operators.
//!
//! Handles: BMC, BDC, EMC
//!
//! Optional-content layers are marked content spans tagged `/OC` whose
//! property list names the layer through the `Properties` resources.

use crate::canvas::PdfCanvas;
use crate::canvas::resources::ResourceType;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};

impl PdfCanvas<'_> {
    /// Opens a marked content span without properties.
    ///
    /// PDF operator: `BMC`
    pub fn begin_marked_content(&mut self, tag: &str) -> &mut Self {
        self.marked_content_depth += 1;
        self.write_name(tag);
        self.write_operator("BMC");
        self
    }

    /// Opens a marked content span with an inline property list.
    ///
    /// PDF operator: `BDC`
    pub fn begin_marked_content_with(&mut self, tag: &str, properties: &PdfDict) -> &mut Self {
        self.marked_content_depth += 1;
        self.write_name(tag);
        self.write_object(&PdfObject::Dict(properties.clone()));
        self.write_operator("BDC");
        self
    }

    /// Opens a marked content span whose property list is a `Properties` resource.
    ///
    /// PDF operator: `BDC`
    pub fn begin_marked_content_ref(&mut self, tag: &str, properties: ObjRef) -> Result<&mut Self> {
        let name = self.add_resource(ResourceType::Properties, PdfObject::Ref(properties))?;
        self.marked_content_depth += 1;
        self.write_name(tag);
        self.write_name(&name);
        self.write_operator("BDC");
        Ok(self)
    }

    /// Closes the innermost marked content span.
    ///
    /// PDF operator: `EMC`
    pub fn end_marked_content(&mut self) -> Result<&mut Self> {
        if self.marked_content_depth == 0 {
            return Err(PdfError::UnbalancedMarkedContent);
        }
        self.marked_content_depth -= 1;
        self.write_operator("EMC");
        Ok(self)
    }

    /// Starts content belonging to the optional-content group `layer`.
    pub fn begin_layer(&mut self, layer: ObjRef) -> Result<&mut Self> {
        self.begin_marked_content_ref("OC", layer)?;
        self.layer_depths.push(self.marked_content_depth);
        Ok(self)
    }

    /// Ends the innermost layer, closing spans still open inside it.
    pub fn end_layer(&mut self) -> Result<&mut Self> {
        let depth = self.layer_depths.pop().ok_or(PdfError::UnbalancedMarkedContent)?;
        while self.marked_content_depth >= depth {
            self.end_marked_content()?;
        }
        Ok(self)
    }

    /// Number of open marked content spans.
    pub fn marked_content_depth(&self) -> usize {
        self.marked_content_depth
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::PdfCanvas;
    use crate::document::PdfDocument;
    use crate::error::PdfError;

    #[test]
    fn test_second_emc_fails() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_marked_content("Tag1");
        assert!(canvas.end_marked_content().is_ok());
        assert!(matches!(
            canvas.end_marked_content(),
            Err(PdfError::UnbalancedMarkedContent)
        ));
    }

    #[test]
    fn test_layer_spans() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let layer = doc.catalog().add_layer("Notes").unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_layer(layer).unwrap();
        canvas.begin_marked_content_with("Span", &crate::pdf_dict! { "MCID" => 0 });
        canvas.end_layer().unwrap();
        assert_eq!(canvas.marked_content_depth(), 0);
        assert_eq!(
            canvas.pending(),
            b"/OC /Pr1 BDC\n/Span <</MCID 0>> BDC\nEMC\nEMC\n"
        );
        assert!(matches!(canvas.end_layer(), Err(PdfError::UnbalancedMarkedContent)));
    }
}
