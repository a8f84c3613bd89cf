//! Finding or creating the release to upload into.

use crate::publish::client::{ApiResult, NewRelease, Release, ReleaseClient};

/// Page size for the draft-release scan, the API's maximum.
const RELEASES_PAGE_SIZE: u32 = 100;

/// Return the release for the requested tag, creating it only when no release
/// with that tag exists yet.
///
/// Non-draft releases are fetched by tag directly. The tag-lookup endpoint
/// never returns drafts, so when a draft is requested the full release list
/// is paginated and linear-searched instead. That is an API limitation, not
/// an optimization. Any unexpected API failure aborts.
pub fn create_or_find_release(
    client: &ReleaseClient,
    params: &NewRelease,
) -> ApiResult<Release> {
    if params.draft {
        let mut page = 1;
        loop {
            let releases = client.releases(page, RELEASES_PAGE_SIZE)?;
            if let Some(release) = releases.iter().find(|r| r.tag_name == params.tag_name) {
                tracing::info!("found existing draft release for tag {}", params.tag_name);
                return Ok(release.clone());
            }
            if releases.len() < RELEASES_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
    } else if let Some(release) = client.release_by_tag(&params.tag_name)? {
        tracing::info!("found existing release for tag {}", params.tag_name);
        return Ok(release);
    }

    tracing::info!("creating release for tag {}", params.tag_name);
    client.create_release(params)
}
