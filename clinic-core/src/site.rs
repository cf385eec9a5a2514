//! URL templates for the publisher's site.

use crate::config::SiteConfig;

impl SiteConfig {
    pub fn index_url(&self, year: u16) -> String {
        format!("{}/docs/comic/clinic/index{}.html", self.base_url, year)
    }

    /// Episode page over the primary origin, then the fallback one.
    pub fn episode_urls(&self, doc_id: u64) -> [String; 2] {
        [
            episode_url(&self.base_url, doc_id),
            episode_url(&self.fallback_base_url, doc_id),
        ]
    }

    /// `{base}/img/dcw/docs/{first 4 digits}/{next 3 digits}/`
    pub fn image_dir(&self, doc_id: u64) -> String {
        let digits = doc_id.to_string();
        let head = digits.len().min(4);
        let tail = digits.len().min(7);
        format!(
            "{}/img/dcw/docs/{}/{}/",
            self.base_url,
            &digits[..head],
            &digits[head..tail]
        )
    }

    /// Every candidate URL for one image, in probe order.
    pub fn image_candidates(&self, doc_id: u64, image_index: u32) -> Vec<String> {
        let dir = self.image_dir(doc_id);
        let idx = image_index_str(image_index);
        let idx_a = idx.replace('0', "a");
        self.image_patterns
            .iter()
            .map(|pattern| {
                let name = pattern.replace("{idx_a}", &idx_a).replace("{idx}", &idx);
                format!("{}{}", dir, name)
            })
            .collect()
    }

    /// The plain numbered URL used when counting images on legacy pages.
    pub fn numbered_image_url(&self, doc_id: u64, image_index: u32) -> String {
        format!("{}{}.png", self.image_dir(doc_id), image_index_str(image_index))
    }

    pub fn is_excluded(&self, doc_id: u64) -> bool {
        self.excluded_ids.contains(&doc_id)
    }
}

fn episode_url(base: &str, doc_id: u64) -> String {
    format!("{}/docs/comic/clinic/{}.html", base, doc_id)
}

fn image_index_str(image_index: u32) -> String {
    format!("{:02}", image_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dir_shards_id() {
        let site = SiteConfig::default();
        assert_eq!(
            site.image_dir(1050123),
            "https://dc.watch.impress.co.jp/img/dcw/docs/1050/123/"
        );
    }

    #[test]
    fn test_image_dir_short_id_does_not_panic() {
        let site = SiteConfig::with_base_url("http://x");
        assert_eq!(site.image_dir(12), "http://x/img/dcw/docs/12//");
    }

    #[test]
    fn test_image_candidates_order() {
        let site = SiteConfig::with_base_url("http://x");
        let names: Vec<String> = site
            .image_candidates(1050123, 10)
            .into_iter()
            .map(|u| u.rsplit('/').next().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["10.png", "1a.png", "a10.png", "x10.png", "y10.png", "z10.png", "10a.png", "10.jpg"]
        );
    }

    #[test]
    fn test_image_candidates_zero_pad() {
        let site = SiteConfig::with_base_url("http://x");
        let first_two: Vec<String> = site.image_candidates(1050123, 3).into_iter().take(2).collect();
        assert_eq!(
            first_two,
            vec![
                "http://x/img/dcw/docs/1050/123/03.png".to_string(),
                "http://x/img/dcw/docs/1050/123/a3.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_episode_urls_primary_then_fallback() {
        let site = SiteConfig::default();
        let [primary, fallback] = site.episode_urls(1050123);
        assert_eq!(primary, "https://dc.watch.impress.co.jp/docs/comic/clinic/1050123.html");
        assert_eq!(fallback, "http://dc.watch.impress.co.jp/docs/comic/clinic/1050123.html");
    }

    #[test]
    fn test_index_url() {
        let site = SiteConfig::default();
        assert_eq!(
            site.index_url(2018),
            "https://dc.watch.impress.co.jp/docs/comic/clinic/index2018.html"
        );
    }
}
