use crate::JobId;

pub(crate) struct Id(String);
impl Id {
    pub fn to_string(&self) -> String {
        self.0.clone()
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Keys under which things are kept in a [`crate::storage::Storage`].
pub(crate) enum IdOf<'a> {
    JobPayload { prefix: &'a str, id: JobId },
}

impl IdOf<'_> {
    pub fn get_id(&self) -> Id {
        match self {
            IdOf::JobPayload { prefix, id } => Id(format!("{}{}", prefix, id)),
        }
    }
}
