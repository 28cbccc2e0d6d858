use crate::trial::Response;

/// Keys the session reacts to, decoupled from any windowing backend
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Advance on static screens, "unknown" while answering
    Space,
    Enter,
    Escape,
    Char(char),
    Other,
}

impl Key {
    pub fn is_advance(&self) -> bool {
        matches!(self, Key::Space)
    }

    /// Maps a key to an answer. Letters are uppercased; anything that is
    /// neither a letter nor the unknown key yields `None`.
    pub fn as_response(&self) -> Option<Response> {
        match self {
            Key::Space => Some(Response::Unknown),
            Key::Char(c) if c.is_ascii_alphabetic() => {
                Some(Response::Letter(c.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_uppercased() {
        assert_eq!(Key::Char('q').as_response(), Some(Response::Letter('Q')));
        assert_eq!(Key::Char('Z').as_response(), Some(Response::Letter('Z')));
    }

    #[test]
    fn space_is_unknown() {
        assert_eq!(Key::Space.as_response(), Some(Response::Unknown));
    }

    #[test]
    fn other_keys_are_not_responses() {
        assert_eq!(Key::Char('7').as_response(), None);
        assert_eq!(Key::Char('é').as_response(), None);
        assert_eq!(Key::Enter.as_response(), None);
        assert_eq!(Key::Other.as_response(), None);
    }
}
