use std::fmt::{Display, Formatter};

/// Logical address of a container inside a storage account.
///
/// Holding a `ContainerRef` says nothing about whether the container exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    account_name: String,
    name: String,
}

impl ContainerRef {
    /// Address `name` inside `account_name`.
    pub fn new(account_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            name: name.into(),
        }
    }

    /// Storage account owning this container.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address the blob `name` inside this container.
    pub fn blob(&self, name: impl Into<String>) -> BlobRef {
        BlobRef {
            container: self.clone(),
            name: name.into(),
        }
    }
}

impl Display for ContainerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_name, self.name)
    }
}

/// Logical address of a blob inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    container: ContainerRef,
    name: String,
}

impl BlobRef {
    /// Container holding this blob.
    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// Blob name, `/` separated virtual directories included.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for BlobRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let container = ContainerRef::new("myaccount", "mycontainer");
        let blob = container.blob("dir/hello.txt");

        assert_eq!(container.to_string(), "myaccount/mycontainer");
        assert_eq!(blob.to_string(), "myaccount/mycontainer/dir/hello.txt");
        assert_eq!(blob.container(), &container);
    }
}
