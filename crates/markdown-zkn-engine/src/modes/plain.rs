use crate::grammar::{Mode, Style};
use crate::stream::StringStream;

/// Consumes every line unstyled. Used for `text` fences and unknown content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMode;

impl Mode for PlainMode {
    type State = ();

    fn name(&self) -> &str {
        "text"
    }

    fn start_state(&self) {}

    fn token(&self, stream: &mut StringStream<'_>, _state: &mut ()) -> Option<Style> {
        stream.skip_to_end();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_consumes_whole_line() {
        let mut stream = StringStream::new("anything *at* all");
        assert_eq!(PlainMode.token(&mut stream, &mut ()), None);
        assert!(stream.eol());
    }
}
