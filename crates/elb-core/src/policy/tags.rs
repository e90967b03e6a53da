//! Tag propagation from cluster to load balancer

use crate::cluster::Tag;

/// The tag key naming a resource
pub const NAME_TAG_KEY: &str = "Name";

/// Derive load balancer tags from the cluster's stack tags
///
/// Each "Name" tag is replaced in place by `(cluster_tag_key, value)`
/// followed by `("Name", app_name)`. Everything else passes through.
pub fn build_tags(cluster_tags: &[Tag], app_name: &str, cluster_tag_key: &str) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(cluster_tags.len() + 1);
    for tag in cluster_tags {
        if tag.key == NAME_TAG_KEY {
            tags.push(Tag::new(cluster_tag_key, tag.value.clone()));
            tags.push(Tag::new(NAME_TAG_KEY, app_name));
        } else {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tag_expands_in_place() {
        let cluster_tags = vec![
            Tag::new("Environment", "prod"),
            Tag::new("Name", "blue-cluster"),
            Tag::new("CostCenter", "1234"),
        ];

        let tags = build_tags(&cluster_tags, "orders", "Cluster");

        assert_eq!(
            tags,
            vec![
                Tag::new("Environment", "prod"),
                Tag::new("Cluster", "blue-cluster"),
                Tag::new("Name", "orders"),
                Tag::new("CostCenter", "1234"),
            ]
        );
    }

    #[test]
    fn no_name_tag_passes_through() {
        let cluster_tags = vec![Tag::new("Environment", "dev")];
        assert_eq!(build_tags(&cluster_tags, "orders", "Cluster"), cluster_tags);
    }

    #[test]
    fn each_name_tag_expands() {
        let cluster_tags = vec![Tag::new("Name", "a"), Tag::new("Name", "b")];

        let tags = build_tags(&cluster_tags, "orders", "Cluster");

        assert_eq!(tags.len(), cluster_tags.len() + 2);
        assert_eq!(tags[0], Tag::new("Cluster", "a"));
        assert_eq!(tags[2], Tag::new("Cluster", "b"));
        assert_eq!(tags.iter().filter(|t| t.key == "Name").count(), 2);
    }

    #[test]
    fn key_match_is_case_sensitive() {
        let cluster_tags = vec![Tag::new("name", "lowercase")];
        assert_eq!(build_tags(&cluster_tags, "orders", "Cluster"), cluster_tags);
    }
}
