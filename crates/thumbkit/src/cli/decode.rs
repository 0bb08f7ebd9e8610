//! The `thumbkit decode` command: show how the worker reads a message body.

use clap::Args;
use std::path::PathBuf;
use thumbkit_core::codec;

/// Arguments for the `decode` command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding the message body (reads stdin when omitted)
    pub input: Option<PathBuf>,
}

/// Execute the decode command.
pub async fn execute(args: DecodeArgs) -> anyhow::Result<()> {
    let raw = super::read_input(args.input.as_deref())?;
    let (encoding, pretty) = describe(&raw)?;

    eprintln!("Encoding: {encoding}");
    println!("{pretty}");
    Ok(())
}

/// Decode `raw` and render the normalized job as pretty JSON.
fn describe(raw: &[u8]) -> anyhow::Result<(codec::BodyEncoding, String)> {
    let (job, encoding) = codec::decode_with_encoding(raw)?;
    Ok((encoding, serde_json::to_string_pretty(&job)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::BodyEncoding;

    #[test]
    fn describe_legacy_base64_body() {
        // {"original":"/a.jpg","prefix":"/a","descriptions":[]}
        let raw = b"eyJvcmlnaW5hbCI6Ii9hLmpwZyIsInByZWZpeCI6Ii9hIiwiZGVzY3JpcHRpb25zIjpbXX0=";
        let (encoding, pretty) = describe(raw).unwrap();

        assert_eq!(encoding, BodyEncoding::Base64Json);
        let value: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(value["resources"], serde_json::json!(["/a.jpg"]));
        assert_eq!(value["original"], "/a.jpg");
    }

    #[test]
    fn describe_rejects_garbage() {
        let err = describe(b"{not json").unwrap_err();
        assert!(err.to_string().contains("Malformed"), "unexpected: {err}");
    }
}
