//! S3 error XML formatting.
//!
//! Error responses use the flat `<Error>` element AWS emits (no outer
//! wrapper), carrying the error code, the request id, and the resource the
//! request addressed.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// Format an S3 error as XML.
///
/// # Example output
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchKey</Code>
///   <RequestId>8a3f...</RequestId>
///   <Resource>/mybucket/mykey</Resource>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(code: &str, request_id: &str, resource: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    // Writing to Vec<u8> is infallible; if this fails it means a logic error.
    if let Err(e) = write_error_xml(&mut buf, code, request_id, resource) {
        tracing::error!(error = %e, "failed to serialize error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(
    buf: &mut Vec<u8>,
    code: &str,
    request_id: &str,
    resource: &str,
) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code")
            .write_text_content(BytesText::new(code))?;
        w.create_element("RequestId")
            .write_text_content(BytesText::new(request_id))?;
        w.create_element("Resource")
            .write_text_content(BytesText::new(resource))?;
        Ok(())
    })?;

    Ok(())
}
