//! Minimal KML output for looking at clusters in a map viewer.
//!
//! Only the handful of elements needed to draw clusters are here. It is a streaming API, so the
//! user is responsible for closing all tags.

use crate::{
    cluster::{Cluster, ClusterList},
    geo::{Coord, Geo},
    EpiClusterResult,
};
use chrono::NaiveDate;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Number of vertices used to draw the circle around a cluster.
const CIRCLE_VERTICES: usize = 36;

/// Style ids used for cluster placemarks.
const ACTIVE_STYLE: &str = "active";
const INACTIVE_STYLE: &str = "inactive";

/// Replace the characters that can't appear as-is in XML text.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct KmlFile(BufWriter<File>);

impl KmlFile {
    pub fn new<P: AsRef<Path>>(pth: P) -> EpiClusterResult<Self> {
        let p = pth.as_ref();

        let f = std::fs::File::create(p)?;
        let mut new = KmlFile(BufWriter::new(f));
        new.start_document()?;
        Ok(new)
    }
}

impl KmlWriter for KmlFile {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.0
    }
}

impl Drop for KmlFile {
    fn drop(&mut self) {
        self.finish_document();
    }
}

pub trait KmlWriter {
    fn output(&mut self) -> &mut dyn Write;

    /// Start by putting the header out.
    fn start_document(&mut self) -> EpiClusterResult<()> {
        const HEADER: &str = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#,
            "\n",
            "<Document>\n"
        );

        self.output().write_all(HEADER.as_bytes())?;

        Ok(())
    }

    /// Close a document.
    fn finish_document(&mut self) {
        const FOOTER: &str = concat!(r#"</Document>"#, "\n", r#"</kml>"#, "\n");
        let _ = self.output().write_all(FOOTER.as_bytes());
        let _ = self.output().flush();
    }

    /// Write a description element to the file.
    fn write_description(&mut self, description: &str) -> EpiClusterResult<()> {
        writeln!(
            self.output(),
            "<description><![CDATA[{}]]></description>",
            description
        )?;
        Ok(())
    }

    /// Start a KML folder.
    fn start_folder(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        is_open: bool,
    ) -> EpiClusterResult<()> {
        self.output().write_all("<Folder>\n".as_bytes())?;

        if let Some(name) = name {
            writeln!(self.output(), "<name>{}</name>", escape_text(name))?;
        }

        if let Some(description) = description {
            self.write_description(description)?;
        }

        if is_open {
            self.output().write_all("<open>1</open>\n".as_bytes())?;
        }

        Ok(())
    }

    /// Close out a folder element
    fn finish_folder(&mut self) -> EpiClusterResult<()> {
        writeln!(self.output(), "</Folder>")?;
        Ok(())
    }

    /// Start a placemark element.
    fn start_placemark(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        style_url: Option<&str>,
    ) -> EpiClusterResult<()> {
        writeln!(self.output(), "<Placemark>")?;

        if let Some(name) = name {
            writeln!(self.output(), "<name>{}</name>", escape_text(name))?;
        }

        if let Some(description) = description {
            self.write_description(description)?;
        }

        if let Some(style_url) = style_url {
            writeln!(self.output(), "<styleUrl>{}</styleUrl>", style_url)?;
        }

        Ok(())
    }

    /// Close out a placemark element.
    fn finish_placemark(&mut self) -> EpiClusterResult<()> {
        writeln!(self.output(), "</Placemark>")?;
        Ok(())
    }

    /// Start a style definition.
    fn start_style(&mut self, style_id: Option<&str>) -> EpiClusterResult<()> {
        if let Some(style_id) = style_id {
            writeln!(self.output(), "<Style id=\"{}\">", style_id)?;
        } else {
            writeln!(self.output(), "<Style>")?;
        }
        Ok(())
    }

    /// Close out a style definition.
    fn finish_style(&mut self) -> EpiClusterResult<()> {
        writeln!(self.output(), "</Style>")?;
        Ok(())
    }

    /// Create a PolyStyle element.
    ///
    /// These should ONLY go inside a style element.
    fn create_poly_style(
        &mut self,
        color: Option<&str>,
        filled: bool,
        outlined: bool,
    ) -> EpiClusterResult<()> {
        writeln!(self.output(), "<PolyStyle>")?;

        if let Some(color) = color {
            writeln!(self.output(), "<color>{}</color>", color)?;
            writeln!(self.output(), "<colorMode>normal</colorMode>")?;
        } else {
            writeln!(self.output(), "<colorMode>random</colorMode>")?;
        }

        let filled = if filled { 1 } else { 0 };
        let outlined = if outlined { 1 } else { 0 };

        writeln!(self.output(), "<fill>{}</fill>", filled)?;
        writeln!(self.output(), "<outline>{}</outline>", outlined)?;

        writeln!(self.output(), "</PolyStyle>")?;
        Ok(())
    }

    /// Write out a TimeSpan element covering whole days.
    fn timespan(&mut self, start: NaiveDate, end: NaiveDate) -> EpiClusterResult<()> {
        self.output().write_all("<TimeSpan>\n".as_bytes())?;
        writeln!(self.output(), "<begin>{}</begin>", start.format("%Y-%m-%d"))?;
        writeln!(self.output(), "<end>{}</end>", end.format("%Y-%m-%d"))?;
        self.output().write_all("</TimeSpan>\n".as_bytes())?;
        Ok(())
    }

    /// Start a MultiGeometry
    fn start_multi_geometry(&mut self) -> EpiClusterResult<()> {
        self.output().write_all("<MultiGeometry>\n".as_bytes())?;
        Ok(())
    }

    /// Close out a MultiGeometry
    fn finish_multi_geometry(&mut self) -> EpiClusterResult<()> {
        self.output().write_all("</MultiGeometry>\n".as_bytes())?;
        Ok(())
    }

    /// Write a closed polygon, clamped to the ground, from its outer ring of vertices.
    ///
    /// The first vertex is repeated at the end to close the ring.
    fn create_polygon(&mut self, ring: &[Coord]) -> EpiClusterResult<()> {
        self.output().write_all(
            concat!(
                "<Polygon>\n",
                "<altitudeMode>clampToGround</altitudeMode>\n",
                "<tessellate>1</tessellate>\n",
                "<outerBoundaryIs>\n",
                "<LinearRing>\n",
                "<coordinates>\n"
            )
            .as_bytes(),
        )?;

        for vertex in ring.iter().chain(ring.first()) {
            writeln!(self.output(), "{},{},0", vertex.lon, vertex.lat)?;
        }

        self.output().write_all(
            concat!(
                "</coordinates>\n",
                "</LinearRing>\n",
                "</outerBoundaryIs>\n",
                "</Polygon>\n"
            )
            .as_bytes(),
        )?;
        Ok(())
    }

    /// Write out a KML Point element
    fn create_point(&mut self, lat: f64, lon: f64, z: f64) -> EpiClusterResult<()> {
        writeln!(
            self.output(),
            "<Point>\n<coordinates>{},{},{}</coordinates>\n</Point>",
            lon,
            lat,
            z
        )?;
        Ok(())
    }

    /// Define the styles used by [write_cluster](KmlWriter::write_cluster).
    fn write_cluster_styles(&mut self) -> EpiClusterResult<()> {
        self.start_style(Some(ACTIVE_STYLE))?;
        self.create_poly_style(Some("880000FF"), true, true)?;
        self.finish_style()?;

        self.start_style(Some(INACTIVE_STYLE))?;
        self.create_poly_style(Some("5500AAFF"), true, true)?;
        self.finish_style()
    }

    /// Write a cluster as a placemark with its center and a circle of its radius.
    fn write_cluster(&mut self, cluster: &Cluster) -> EpiClusterResult<()> {
        let (first, last) = cluster.date_range;

        let description = format!(
            concat!(
                "Cases: {}<br/>",
                "Locations: {}<br/>",
                "First Case: {}<br/>",
                "Last Case: {}<br/>",
                "Radius: {:.0} m<br/>",
                "Active: {}<br/>"
            ),
            cluster.total_cases,
            cluster.unique_locations,
            first,
            last,
            cluster.radius_meters,
            if cluster.is_active { "yes" } else { "no" },
        );

        let style = if cluster.is_active {
            format!("#{}", ACTIVE_STYLE)
        } else {
            format!("#{}", INACTIVE_STYLE)
        };

        let name = cluster.id.to_string();
        self.start_placemark(Some(&name), Some(&description), Some(&style))?;
        self.timespan(first, last)?;

        let center = cluster.coord();
        let ring: Vec<Coord> = (0..CIRCLE_VERTICES)
            .map(|i| i as f64 * 360.0 / CIRCLE_VERTICES as f64)
            .map(|bearing| center.destination(bearing, cluster.radius_meters))
            .collect();

        self.start_multi_geometry()?;
        self.create_point(center.lat, center.lon, 0.0)?;
        self.create_polygon(&ring)?;
        self.finish_multi_geometry()?;

        self.finish_placemark()
    }

    /// Write every cluster in a list into its own folder named after the source.
    fn write_cluster_list(&mut self, list: &ClusterList) -> EpiClusterResult<()> {
        let description = format!(
            "As of {}<br/>{} clusters, {} active",
            list.as_of,
            list.clusters.len(),
            list.num_active()
        );

        self.start_folder(Some(&list.source), Some(&description), false)?;

        for cluster in &list.clusters {
            self.write_cluster(cluster)?;
        }

        self.finish_folder()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::ClusterConfig, event::RawCaseRecord};

    struct KmlBuffer(Vec<u8>);

    impl KmlWriter for KmlBuffer {
        fn output(&mut self) -> &mut dyn Write {
            &mut self.0
        }
    }

    #[test]
    fn test_write_cluster_list() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let records = vec![RawCaseRecord {
            location_id: 3,
            latitude: -43.30,
            longitude: -65.10,
            event_dates: vec![day(1), day(10), day(17)],
            disease_label: "Dengue".to_owned(),
            group_id: None,
        }];

        let list = ClusterList::from_records("chubut", &records, &ClusterConfig::default(), day(20));

        let mut buf = KmlBuffer(vec![]);
        buf.start_document().unwrap();
        buf.write_cluster_styles().unwrap();
        buf.write_cluster_list(&list).unwrap();
        buf.finish_document();

        let text = String::from_utf8(buf.0).unwrap();

        assert!(text.starts_with("<?xml"));
        assert!(text.trim_end().ends_with("</kml>"));
        assert!(text.contains("<name>chubut</name>"));
        assert!(text.contains("<name>cluster-0</name>"));
        assert!(text.contains("<styleUrl>#active</styleUrl>"));
        assert!(text.contains("<begin>2024-01-01</begin>"));
        assert!(text.contains("<end>2024-01-17</end>"));
        assert_eq!(text.matches("<Placemark>").count(), 1);
        assert_eq!(text.matches("<Placemark>").count(), text.matches("</Placemark>").count());
    }

    #[test]
    fn test_names_are_escaped() {
        let list = ClusterList::from_records(
            "cases/<north> & \"south\".csv",
            &[],
            &ClusterConfig::default(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );

        let mut buf = KmlBuffer(vec![]);
        buf.write_cluster_list(&list).unwrap();
        let text = String::from_utf8(buf.0).unwrap();

        assert!(text.contains("<name>cases/&lt;north&gt; &amp; &quot;south&quot;.csv</name>"));
        assert!(!text.contains("<north>"));

        assert_eq!(escape_text("plain name"), "plain name");
        assert_eq!(escape_text("it's"), "it&apos;s");
    }
}
