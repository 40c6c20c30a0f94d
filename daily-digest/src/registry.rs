use crate::types::{DigestError, FeedSource, Result, TlsProfile};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// Hosts whose servers only complete a handshake with an older TLS floor.
pub const LEGACY_TLS_HOSTS: &[&str] = &["rachelbythebay.com", "tedunangst.com"];

/// Known alternative feed locations, tried after the primary URL fails.
const FALLBACKS: &[(&str, &str)] = &[("skyfall.dev", "https://skyfall.dev/rss.xml")];

/// Popular technology blogs from the Hacker News 2025 popularity ranking.
const BUILTIN_FEEDS: &[(&str, &str, &str)] = &[
    ("simonwillison.net", "https://simonwillison.net/atom/everything/", "https://simonwillison.net"),
    ("jeffgeerling.com", "https://www.jeffgeerling.com/blog.xml", "https://jeffgeerling.com"),
    ("seangoedecke.com", "https://www.seangoedecke.com/rss.xml", "https://seangoedecke.com"),
    ("krebsonsecurity.com", "https://krebsonsecurity.com/feed/", "https://krebsonsecurity.com"),
    ("daringfireball.net", "https://daringfireball.net/feeds/main", "https://daringfireball.net"),
    ("ericmigi.com", "https://ericmigi.com/rss.xml", "https://ericmigi.com"),
    ("antirez.com", "http://antirez.com/rss", "http://antirez.com"),
    ("idiallo.com", "https://idiallo.com/feed.rss", "https://idiallo.com"),
    ("maurycyz.com", "https://maurycyz.com/index.xml", "https://maurycyz.com"),
    ("pluralistic.net", "https://pluralistic.net/feed/", "https://pluralistic.net"),
    ("shkspr.mobi", "https://shkspr.mobi/blog/feed/", "https://shkspr.mobi"),
    ("lcamtuf.substack.com", "https://lcamtuf.substack.com/feed", "https://lcamtuf.substack.com"),
    ("mitchellh.com", "https://mitchellh.com/feed.xml", "https://mitchellh.com"),
    ("dynomight.net", "https://dynomight.net/feed.xml", "https://dynomight.net"),
    ("utcc.utoronto.ca/~cks", "https://utcc.utoronto.ca/~cks/space/blog/?atom", "https://utcc.utoronto.ca/~cks"),
    ("xeiaso.net", "https://xeiaso.net/blog.rss", "https://xeiaso.net"),
    ("devblogs.microsoft.com/oldnewthing", "https://devblogs.microsoft.com/oldnewthing/feed", "https://devblogs.microsoft.com/oldnewthing"),
    ("righto.com", "https://www.righto.com/feeds/posts/default", "https://righto.com"),
    ("lucumr.pocoo.org", "https://lucumr.pocoo.org/feed.atom", "https://lucumr.pocoo.org"),
    ("skyfall.dev", "https://skyfall.dev/feed.xml", "https://skyfall.dev"),
    ("garymarcus.substack.com", "https://garymarcus.substack.com/feed", "https://garymarcus.substack.com"),
    ("rachelbythebay.com", "https://rachelbythebay.com/w/atom.xml", "https://rachelbythebay.com"),
    ("overreacted.io", "https://overreacted.io/rss.xml", "https://overreacted.io"),
    ("timsh.org", "https://timsh.org/rss/", "https://timsh.org"),
    ("johndcook.com", "https://www.johndcook.com/blog/feed/", "https://johndcook.com"),
    ("gilesthomas.com", "https://gilesthomas.com/feed/rss.xml", "https://gilesthomas.com"),
    ("matklad.github.io", "https://matklad.github.io/feed.xml", "https://matklad.github.io"),
    ("derekthompson.org", "https://www.theatlantic.com/feed/author/derek-thompson/", "https://derekthompson.org"),
    ("evanhahn.com", "https://evanhahn.com/feed.xml", "https://evanhahn.com"),
    ("terriblesoftware.org", "https://terriblesoftware.org/feed/", "https://terriblesoftware.org"),
    ("rakhim.exotext.com", "https://rakhim.exotext.com/rss.xml", "https://rakhim.exotext.com"),
    ("joanwestenberg.com", "https://joanwestenberg.com/rss", "https://joanwestenberg.com"),
    ("xania.org", "https://xania.org/feed", "https://xania.org"),
    ("micahflee.com", "https://micahflee.com/feed/", "https://micahflee.com"),
    ("nesbitt.io", "https://nesbitt.io/feed.xml", "https://nesbitt.io"),
    ("construction-physics.com", "https://www.construction-physics.com/feed", "https://construction-physics.com"),
    ("tedium.co", "https://feed.tedium.co/", "https://tedium.co"),
    ("susam.net", "https://susam.net/feed.xml", "https://susam.net"),
    ("entropicthoughts.com", "https://entropicthoughts.com/feed.xml", "https://entropicthoughts.com"),
    ("buttondown.com/hillelwayne", "https://buttondown.com/hillelwayne/rss", "https://buttondown.com/hillelwayne"),
    ("dwarkesh.com", "https://www.dwarkeshpatel.com/feed", "https://dwarkesh.com"),
    ("borretti.me", "https://borretti.me/feed.xml", "https://borretti.me"),
    ("wheresyoured.at", "https://www.wheresyoured.at/rss/", "https://wheresyoured.at"),
    ("jayd.ml", "https://jayd.ml/feed.xml", "https://jayd.ml"),
    ("minimaxir.com", "https://minimaxir.com/index.xml", "https://minimaxir.com"),
    ("geohot.github.io", "https://geohot.github.io/blog/feed.xml", "https://geohot.github.io"),
    ("paulgraham.com", "http://www.aaronsw.com/2002/feeds/pgessays.rss", "https://paulgraham.com"),
    ("filfre.net", "https://www.filfre.net/feed/", "https://filfre.net"),
    ("blog.jim-nielsen.com", "https://blog.jim-nielsen.com/feed.xml", "https://blog.jim-nielsen.com"),
    ("dfarq.homeip.net", "https://dfarq.homeip.net/feed/", "https://dfarq.homeip.net"),
    ("jyn.dev", "https://jyn.dev/atom.xml", "https://jyn.dev"),
    ("geoffreylitt.com", "https://www.geoffreylitt.com/feed.xml", "https://geoffreylitt.com"),
    ("downtowndougbrown.com", "https://www.downtowndougbrown.com/feed/", "https://downtowndougbrown.com"),
    ("brutecat.com", "https://brutecat.com/rss.xml", "https://brutecat.com"),
    ("eli.thegreenplace.net", "https://eli.thegreenplace.net/feeds/all.atom.xml", "https://eli.thegreenplace.net"),
    ("abortretry.fail", "https://www.abortretry.fail/feed", "https://abortretry.fail"),
    ("fabiensanglard.net", "https://fabiensanglard.net/rss.xml", "https://fabiensanglard.net"),
    ("oldvcr.blogspot.com", "https://oldvcr.blogspot.com/feeds/posts/default", "https://oldvcr.blogspot.com"),
    ("bogdanthegeek.github.io", "https://bogdanthegeek.github.io/blog/index.xml", "https://bogdanthegeek.github.io"),
    ("hugotunius.se", "https://hugotunius.se/feed.xml", "https://hugotunius.se"),
    ("gwern.net", "https://gwern.substack.com/feed", "https://gwern.net"),
    ("berthub.eu", "https://berthub.eu/articles/index.xml", "https://berthub.eu"),
    ("chadnauseam.com", "https://chadnauseam.com/rss.xml", "https://chadnauseam.com"),
    ("simone.org", "https://simone.org/feed/", "https://simone.org"),
    ("it-notes.dragas.net", "https://it-notes.dragas.net/feed/", "https://it-notes.dragas.net"),
    ("beej.us", "https://beej.us/blog/rss.xml", "https://beej.us"),
    ("hey.paris", "https://hey.paris/index.xml", "https://hey.paris"),
    ("danielwirtz.com", "https://danielwirtz.com/rss.xml", "https://danielwirtz.com"),
    ("matduggan.com", "https://matduggan.com/rss/", "https://matduggan.com"),
    ("refactoringenglish.com", "https://refactoringenglish.com/index.xml", "https://refactoringenglish.com"),
    ("worksonmymachine.substack.com", "https://worksonmymachine.substack.com/feed", "https://worksonmymachine.substack.com"),
    ("philiplaine.com", "https://philiplaine.com/index.xml", "https://philiplaine.com"),
    ("steveblank.com", "https://steveblank.com/feed/", "https://steveblank.com"),
    ("bernsteinbear.com", "https://bernsteinbear.com/feed.xml", "https://bernsteinbear.com"),
    ("danieldelaney.net", "https://danieldelaney.net/feed", "https://danieldelaney.net"),
    ("troyhunt.com", "https://www.troyhunt.com/rss/", "https://troyhunt.com"),
    ("herman.bearblog.dev", "https://herman.bearblog.dev/feed/", "https://herman.bearblog.dev"),
    ("tomrenner.com", "https://tomrenner.com/index.xml", "https://tomrenner.com"),
    ("blog.pixelmelt.dev", "https://blog.pixelmelt.dev/rss/", "https://blog.pixelmelt.dev"),
    ("martinalderson.com", "https://martinalderson.com/feed.xml", "https://martinalderson.com"),
    ("danielchasehooper.com", "https://danielchasehooper.com/feed.xml", "https://danielchasehooper.com"),
    ("chiark.greenend.org.uk/~sgtatham", "https://www.chiark.greenend.org.uk/~sgtatham/quasiblog/feed.xml", "https://chiark.greenend.org.uk/~sgtatham"),
    ("grantslatton.com", "https://grantslatton.com/rss.xml", "https://grantslatton.com"),
    ("experimental-history.com", "https://www.experimental-history.com/feed", "https://experimental-history.com"),
    ("anildash.com", "https://anildash.com/feed.xml", "https://anildash.com"),
    ("aresluna.org", "https://aresluna.org/main.rss", "https://aresluna.org"),
    ("michael.stapelberg.ch", "https://michael.stapelberg.ch/feed.xml", "https://michael.stapelberg.ch"),
    ("miguelgrinberg.com", "https://blog.miguelgrinberg.com/feed", "https://miguelgrinberg.com"),
    ("keygen.sh", "https://keygen.sh/blog/feed.xml", "https://keygen.sh"),
    ("mjg59.dreamwidth.org", "https://mjg59.dreamwidth.org/data/rss", "https://mjg59.dreamwidth.org"),
    ("computer.rip", "https://computer.rip/rss.xml", "https://computer.rip"),
    ("tedunangst.com", "https://www.tedunangst.com/flak/rss", "https://tedunangst.com"),
];

/// Static catalog of feed sources, loaded once at startup.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    sources: Vec<FeedSource>,
}

impl FeedRegistry {
    /// The curated catalog with fallbacks and TLS overrides applied.
    pub fn builtin() -> Self {
        let sources = BUILTIN_FEEDS
            .iter()
            .map(|(name, xml_url, html_url)| FeedSource::new(name, xml_url, html_url))
            .collect();

        // Built-in names are unique, so this cannot fail.
        let registry = Self::apply_overrides(sources);
        info!("Loaded {} built-in feed sources", registry.len());
        registry
    }

    /// A registry over caller-supplied sources. Names must be unique and
    /// fetch URLs must be http(s).
    pub fn from_sources(sources: Vec<FeedSource>) -> Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(DigestError::Config(format!("duplicate feed source name: {}", source.name)));
            }
            if !is_valid_feed_url(&source.xml_url) {
                return Err(DigestError::Config(format!(
                    "feed source {} has an invalid URL: {}",
                    source.name, source.xml_url
                )));
            }
        }
        Ok(Self::apply_overrides(sources))
    }

    fn apply_overrides(sources: Vec<FeedSource>) -> Self {
        let sources = sources
            .into_iter()
            .map(|mut source| {
                for (name, fallback) in FALLBACKS {
                    if source.name == *name {
                        source = source.with_fallback(fallback);
                    }
                }
                if source.tls_profile.is_none() && uses_legacy_tls(&source.xml_url) {
                    debug!("Using legacy TLS profile for {}", source.name);
                    source = source.with_tls_profile(TlsProfile::Legacy);
                }
                source
            })
            .collect();
        Self { sources }
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Whether the URL's host (ignoring a leading `www.`) is on the legacy list.
pub fn uses_legacy_tls(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    LEGACY_TLS_HOSTS.iter().any(|legacy| host.eq_ignore_ascii_case(legacy))
}

pub fn is_valid_feed_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.scheme() == "http" || parsed.scheme() == "https",
        Err(_) => false,
    }
}
