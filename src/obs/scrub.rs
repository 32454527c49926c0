/// Scrubs identifiers and query values from a URL or path before it is logged.
///
/// Numeric path segments become `:id`, `TCN`-prefixed segments become `:tcn_id`, and every
/// query value is replaced by `:<key>`.
pub fn scrub_url(url: &str) -> String {
	let (base, query) = match url.split_once('?') {
		Some((base, query)) => (base, Some(query)),
		None => (url, None),
	};
	let (prefix, path) = split_origin(base);
	let path = path
		.split('/')
		.map(|segment| {
			if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
				":id"
			} else if segment.starts_with("TCN") && segment.len() > 3 {
				":tcn_id"
			} else {
				segment
			}
		})
		.collect::<Vec<_>>()
		.join("/");
	let mut scrubbed = format!("{prefix}{path}");

	if let Some(query) = query.filter(|query| !query.is_empty()) {
		let redacted = query
			.split('&')
			.map(|pair| {
				let key = pair.split_once('=').map_or(pair, |(key, _)| key);

				format!("{key}=:{key}")
			})
			.collect::<Vec<_>>()
			.join("&");

		scrubbed.push('?');
		scrubbed.push_str(&redacted);
	}

	scrubbed
}

fn split_origin(base: &str) -> (&str, &str) {
	let Some(scheme_end) = base.find("://") else {
		return ("", base);
	};
	let after_scheme = scheme_end + 3;

	match base[after_scheme..].find('/') {
		Some(offset) => base.split_at(after_scheme + offset),
		None => (base, ""),
	}
}
